// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::{build_statuses, ResourceStatus, StatusKey, Verdict};
use crate::constants::OPERATOR_NAME;
use crate::error::Result;
use crate::graph::Graph;
use crate::types::{Condition, Gateway, GatewayStatus, HTTPRoute, HTTPRouteStatus};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn, Span};

/// Writes a status to the resource it belongs to.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn write(&self, key: &StatusKey, status: &ResourceStatus) -> Result<()>;
}

/// Status sink patching the `status` subresource through the Kubernetes API.
///
/// The current status is read first: parent entries owned by other controllers are kept, and
/// conditions whose status did not change keep their `lastTransitionTime`. The patch carries the
/// observed `resourceVersion`, so a concurrent writer makes it fail with a conflict and the write
/// is retried on the next cycle.
pub struct KubeStatusSink {
    client: Client,
    controller_name: String,
}

impl KubeStatusSink {
    pub fn new(client: Client, controller_name: impl Into<String>) -> Self {
        Self {
            client,
            controller_name: controller_name.into(),
        }
    }

    fn api<K>(&self, key: &StatusKey) -> Api<K>
    where
        K: kube::Resource<DynamicType = (), Scope = k8s_openapi::NamespaceResourceScope>,
    {
        Api::namespaced(self.client.clone(), &key.name.namespace)
    }

    async fn patch<K, S>(
        &self,
        api: &Api<K>,
        key: &StatusKey,
        resource_version: Option<String>,
        status: S,
    ) -> Result<()>
    where
        K: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
        S: Serialize,
    {
        let mut patch = serde_json::json!({ "status": status });
        if let Some(version) = resource_version {
            patch["metadata"] = serde_json::json!({ "resourceVersion": version });
        }
        let params = PatchParams {
            field_manager: Some(OPERATOR_NAME.to_string()),
            ..Default::default()
        };

        match api.patch_status(&key.name.name, &params, &Patch::Merge(&patch)).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 404 => {
                debug!(resource = %key, "Resource is gone, skipping status update");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_gateway(&self, key: &StatusKey, mut desired: GatewayStatus) -> Result<()> {
        let api: Api<Gateway> = self.api(key);
        let Some(current) = api.get_opt(&key.name.name).await? else {
            debug!(resource = %key, "Resource is gone, skipping status update");
            return Ok(());
        };
        let previous = current.status.unwrap_or_default();
        let now = now();

        carry_transition_times(&mut desired.conditions, &previous.conditions, &now);
        for listener in &mut desired.listeners {
            let before = previous
                .listeners
                .iter()
                .find(|l| l.name == listener.name)
                .map(|l| l.conditions.as_slice())
                .unwrap_or_default();
            carry_transition_times(&mut listener.conditions, before, &now);
        }

        self.patch(&api, key, current.metadata.resource_version, desired).await
    }

    async fn write_route(&self, key: &StatusKey, desired: HTTPRouteStatus) -> Result<()> {
        let api: Api<HTTPRoute> = self.api(key);
        let Some(current) = api.get_opt(&key.name.name).await? else {
            debug!(resource = %key, "Resource is gone, skipping status update");
            return Ok(());
        };
        let previous = current.status.unwrap_or_default();
        let now = now();

        let (ours, mut parents): (Vec<_>, Vec<_>) = previous
            .parents
            .into_iter()
            .partition(|p| p.controller_name == self.controller_name);

        for mut parent in desired.parents {
            let before = ours
                .iter()
                .find(|p| p.parent_ref == parent.parent_ref)
                .map(|p| p.conditions.as_slice())
                .unwrap_or_default();
            carry_transition_times(&mut parent.conditions, before, &now);
            parents.push(parent);
        }

        let status = HTTPRouteStatus { parents };
        self.patch(&api, key, current.metadata.resource_version, status).await
    }
}

#[async_trait]
impl StatusSink for KubeStatusSink {
    async fn write(&self, key: &StatusKey, status: &ResourceStatus) -> Result<()> {
        match status.clone() {
            ResourceStatus::Gateway(s) => self.write_gateway(key, s).await,
            ResourceStatus::HTTPRoute(s) => self.write_route(key, s).await,
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Keep the previous `lastTransitionTime` of conditions whose status is unchanged, stamp the rest.
fn carry_transition_times(conditions: &mut [Condition], previous: &[Condition], now: &str) {
    for condition in conditions {
        let unchanged = previous
            .iter()
            .find(|p| p.condition_type == condition.condition_type && p.status == condition.status)
            .and_then(|p| p.last_transition_time.clone());
        condition.last_transition_time = Some(unchanged.unwrap_or_else(|| now.to_string()));
    }
}

/// Outcome of one status report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub written: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Writes computed statuses, suppressing writes identical to the last successful one.
///
/// Failed writes are not remembered, so the next report retries them.
pub struct StatusReporter {
    sink: Arc<dyn StatusSink>,
    controller_name: String,
    last_written: BTreeMap<StatusKey, ResourceStatus>,
    span: Span,
}

impl StatusReporter {
    pub fn new(sink: Arc<dyn StatusSink>, controller_name: impl Into<String>, span: Span) -> Self {
        Self {
            sink,
            controller_name: controller_name.into(),
            last_written: BTreeMap::new(),
            span,
        }
    }

    #[instrument(parent = &self.span, skip(self, graph))]
    pub async fn report(&mut self, graph: &Graph) -> ReportSummary {
        let desired = build_statuses(graph, &self.controller_name);
        let mut summary = ReportSummary::default();

        // Forget resources that left the graph so they are written again if they come back
        self.last_written.retain(|key, _| desired.contains_key(key));

        for (key, status) in desired {
            if self.last_written.get(&key) == Some(&status) {
                summary.unchanged += 1;
                continue;
            }

            match self.sink.write(&key, &status).await {
                Ok(()) => {
                    match status.verdict() {
                        Verdict::Accepted => info!(resource = %key, "Resource accepted"),
                        Verdict::Rejected { reason, message } => {
                            info!(resource = %key, reason = %reason, message = %message, "Resource rejected")
                        }
                    }
                    self.last_written.insert(key, status);
                    summary.written += 1;
                }
                Err(e) => {
                    warn!(resource = %key, error = %e, "Failed to write status, will retry");
                    self.last_written.remove(&key);
                    summary.failed += 1;
                }
            }
        }

        debug!(
            written = summary.written,
            unchanged = summary.unchanged,
            failed = summary.failed,
            "Reported statuses"
        );
        summary
    }
}
