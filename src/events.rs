// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Events sent from the reconcilers to the sync manager.

use crate::types::{Gateway, HTTPRoute, ReferenceGrant};
use k8s_openapi::api::core::v1::{Secret, Service};
use kube::{Resource as KubeResource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt;

/// Key for a namespaced resource: (namespace, name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn from_resource<K: KubeResource>(resource: &K) -> Self {
        Self::new(resource.namespace().unwrap_or_default(), resource.name_any())
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// The resource kinds tracked by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Gateway,
    HTTPRoute,
    Service,
    ReferenceGrant,
    Secret,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ResourceKind::Gateway => "Gateway",
            ResourceKind::HTTPRoute => "HTTPRoute",
            ResourceKind::Service => "Service",
            ResourceKind::ReferenceGrant => "ReferenceGrant",
            ResourceKind::Secret => "Secret",
        };
        f.write_str(kind)
    }
}

/// A full snapshot of one tracked object
#[derive(Debug, Clone)]
pub enum Resource {
    Gateway(Gateway),
    HTTPRoute(HTTPRoute),
    Service(Service),
    ReferenceGrant(ReferenceGrant),
    Secret(Secret),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Gateway(_) => ResourceKind::Gateway,
            Resource::HTTPRoute(_) => ResourceKind::HTTPRoute,
            Resource::Service(_) => ResourceKind::Service,
            Resource::ReferenceGrant(_) => ResourceKind::ReferenceGrant,
            Resource::Secret(_) => ResourceKind::Secret,
        }
    }

    pub fn namespaced_name(&self) -> NamespacedName {
        match self {
            Resource::Gateway(o) => NamespacedName::from_resource(o),
            Resource::HTTPRoute(o) => NamespacedName::from_resource(o),
            Resource::Service(o) => NamespacedName::from_resource(o),
            Resource::ReferenceGrant(o) => NamespacedName::from_resource(o),
            Resource::Secret(o) => NamespacedName::from_resource(o),
        }
    }
}

/// An event emitted by a reconciler. Upserts carry the full object, deletes only its identity.
#[derive(Debug, Clone)]
pub enum Event {
    Upsert(Resource),
    Delete {
        kind: ResourceKind,
        name: NamespacedName,
    },
}

impl Event {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Event::Upsert(resource) => resource.kind(),
            Event::Delete { kind, .. } => *kind,
        }
    }

    pub fn namespaced_name(&self) -> NamespacedName {
        match self {
            Event::Upsert(resource) => resource.namespaced_name(),
            Event::Delete { name, .. } => name.clone(),
        }
    }
}

/// Maps a watched Kubernetes type to its kind tag and typed event payload.
pub trait TrackedKind:
    KubeResource<DynamicType = ()> + Clone + DeserializeOwned + fmt::Debug + Send + Sync + 'static
{
    const KIND: ResourceKind;

    fn into_resource(self) -> Resource;
}

impl TrackedKind for Gateway {
    const KIND: ResourceKind = ResourceKind::Gateway;

    fn into_resource(self) -> Resource {
        Resource::Gateway(self)
    }
}

impl TrackedKind for HTTPRoute {
    const KIND: ResourceKind = ResourceKind::HTTPRoute;

    fn into_resource(self) -> Resource {
        Resource::HTTPRoute(self)
    }
}

impl TrackedKind for Service {
    const KIND: ResourceKind = ResourceKind::Service;

    fn into_resource(self) -> Resource {
        Resource::Service(self)
    }
}

impl TrackedKind for ReferenceGrant {
    const KIND: ResourceKind = ResourceKind::ReferenceGrant;

    fn into_resource(self) -> Resource {
        Resource::ReferenceGrant(self)
    }
}

impl TrackedKind for Secret {
    const KIND: ResourceKind = ResourceKind::Secret;

    fn into_resource(self) -> Resource {
        Resource::Secret(self)
    }
}
