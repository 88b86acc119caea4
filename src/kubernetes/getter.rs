// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Fetch capability used by the reconcilers.

use crate::error::Result;
use crate::events::{NamespacedName, TrackedKind};
use async_trait::async_trait;
use kube::{Api, Client};
use std::marker::PhantomData;
use tracing::instrument;

/// Retrieves the current state of a named resource. `Ok(None)` means the resource does not exist.
#[async_trait]
pub trait Getter<K>: Send + Sync {
    async fn get(&self, name: &NamespacedName) -> Result<Option<K>>;
}

/// Getter backed by the Kubernetes API
pub struct KubeGetter<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeGetter<K> {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

#[async_trait]
impl<K> Getter<K> for KubeGetter<K>
where
    K: TrackedKind<Scope = k8s_openapi::NamespaceResourceScope>,
{
    #[instrument(skip(self), fields(kind = %K::KIND))]
    async fn get(&self, name: &NamespacedName) -> Result<Option<K>> {
        let api: Api<K> = Api::namespaced(self.client.clone(), &name.namespace);
        Ok(api.get_opt(&name.name).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WaypostError;
    use crate::test_utils::{not_found_json, MockService};
    use crate::types::Gateway;
    use k8s_openapi::api::core::v1::Service;

    #[tokio::test]
    async fn test_get_returns_object() {
        let body = serde_json::json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {"name": "cart", "namespace": "apps"},
            "spec": {"ports": [{"port": 8080}]}
        })
        .to_string();
        let client = MockService::new()
            .on_get("/api/v1/namespaces/apps/services/cart", 200, &body)
            .into_client();

        let getter = KubeGetter::<Service>::new(client);
        let service = getter
            .get(&NamespacedName::new("apps", "cart"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(service.metadata.name.as_deref(), Some("cart"));
    }

    #[tokio::test]
    async fn test_get_not_found_is_none() {
        let client = MockService::new()
            .on_get(
                "/apis/gateway.networking.k8s.io/v1/namespaces/infra/gateways/edge",
                404,
                &not_found_json("gateways", "edge"),
            )
            .into_client();

        let getter = KubeGetter::<Gateway>::new(client);
        let result = getter.get(&NamespacedName::new("infra", "edge")).await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_get_server_error_propagates() {
        let body = serde_json::json!({
            "kind": "Status",
            "apiVersion": "v1",
            "status": "Failure",
            "message": "etcd unavailable",
            "reason": "InternalError",
            "code": 500
        })
        .to_string();
        let client = MockService::new()
            .on_get("/api/v1/namespaces/apps/services/cart", 500, &body)
            .into_client();

        let getter = KubeGetter::<Service>::new(client);
        let result = getter.get(&NamespacedName::new("apps", "cart")).await;

        assert!(matches!(result, Err(WaypostError::KubeError(_))));
    }
}
