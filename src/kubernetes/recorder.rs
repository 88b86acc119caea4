// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes Event recording for rejected resources.
//!
//! Events are fire-and-forget: failures are logged and never propagate.

use crate::constants::event_reasons::RECONCILE;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

/// Publishes human-readable warnings against a resource.
#[async_trait]
pub trait EventRecorder: Send + Sync {
    async fn record_warning(&self, resource: &ObjectReference, reason: &str, message: String);
}

/// Recorder backed by `kube::runtime::events::Recorder`
pub struct KubeEventRecorder {
    recorder: Recorder,
}

impl KubeEventRecorder {
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: None,
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventRecorder for KubeEventRecorder {
    async fn record_warning(&self, resource: &ObjectReference, reason: &str, message: String) {
        let event = Event {
            type_: EventType::Warning,
            reason: reason.to_string(),
            note: Some(message),
            action: RECONCILE.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource).await {
            warn!(
                reason,
                object = ?resource.name,
                error = %e,
                "Failed to publish Kubernetes event"
            );
        }
    }
}
