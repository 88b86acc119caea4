// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reconciler adapter - turns a watch notification into exactly one event for the sync manager.

use crate::constants::event_reasons::REJECTED;
use crate::error::Result;
use crate::events::{Event, NamespacedName, TrackedKind};
use crate::kubernetes::{EventRecorder, Getter};
use crate::sync::SyncManagerHandle;
use crate::validation::Validator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, Span};

/// Returns whether a resource should be processed, and a message to log when it should not.
pub type NamespacedNameFilter = Box<dyn Fn(&NamespacedName) -> (bool, String) + Send + Sync>;

const VALIDATION_ERROR_LOG_MSG: &str = "Rejected the resource because the Gateway API webhook \
     failed to reject it with a validation error; make sure the webhook is installed and running \
     correctly; any existing dataplane configuration for the resource will be removed";

/// What a single reconciliation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The filter vetoed the resource, no event was sent
    Filtered,
    Upserted,
    Deleted,
    /// Validation failed; a delete event was sent and a warning recorded
    Rejected,
    /// Cancellation was observed before the event could be sent
    Cancelled,
}

pub struct AdapterConfig<K> {
    pub getter: Arc<dyn Getter<K>>,
    pub sync_handle: SyncManagerHandle,
    /// Can be `None`
    pub filter: Option<NamespacedNameFilter>,
    /// Can be `None`
    pub validator: Option<Validator<K>>,
    pub recorder: Arc<dyn EventRecorder>,
    pub span: Span,
}

/// Reconciler adapter for one resource kind.
///
/// A successful reconciliation sends either an upsert event (the resource exists and is valid)
/// or a delete event (the resource is gone or was rejected by validation).
pub struct Adapter<K> {
    config: AdapterConfig<K>,
}

impl<K: TrackedKind> Adapter<K> {
    pub fn new(config: AdapterConfig<K>) -> Self {
        Self { config }
    }

    #[instrument(parent = &self.config.span, skip(self, name, cancel), fields(kind = %K::KIND, resource = %name))]
    pub async fn reconcile(&self, name: &NamespacedName, cancel: &CancellationToken) -> Result<Outcome> {
        info!("Reconciling the resource");

        if let Some(filter) = &self.config.filter {
            let (allow, msg) = filter(name);
            if !allow {
                info!("{}", msg);
                return Ok(Outcome::Filtered);
            }
        }

        let object = self.config.getter.get(name).await.inspect_err(|e| {
            error!(error = %e, "Failed to get the resource");
        })?;

        let (event, outcome) = match object {
            None => (self.delete_event(name), Outcome::Deleted),
            Some(object) => match self.validate(&object) {
                Ok(()) => (Event::Upsert(object.into_resource()), Outcome::Upserted),
                Err(validation_error) => {
                    error!(error = %validation_error, "{}", VALIDATION_ERROR_LOG_MSG);
                    self.config
                        .recorder
                        .record_warning(
                            &object.object_ref(&()),
                            REJECTED,
                            format!("{}; validation error: {}", VALIDATION_ERROR_LOG_MSG, validation_error),
                        )
                        .await;
                    (self.delete_event(name), Outcome::Rejected)
                }
            },
        };

        if !self.config.sync_handle.send(event, cancel).await? {
            info!("Did not process the resource because the context was canceled");
            return Ok(Outcome::Cancelled);
        }

        match outcome {
            Outcome::Upserted => info!("Upserted the resource"),
            _ => info!("Deleted the resource"),
        }

        Ok(outcome)
    }

    fn validate(&self, object: &K) -> std::result::Result<(), crate::error::ValidationError> {
        match &self.config.validator {
            Some(validator) => validator(object),
            None => Ok(()),
        }
    }

    fn delete_event(&self, name: &NamespacedName) -> Event {
        Event::Delete {
            kind: K::KIND,
            name: name.clone(),
        }
    }
}

/// Filter that only lets a single resource through, used to pin the controller to one Gateway.
pub fn single_resource_filter(target: NamespacedName) -> NamespacedNameFilter {
    Box::new(move |name: &NamespacedName| {
        if *name == target {
            (true, String::new())
        } else {
            (
                false,
                format!(
                    "Resource is ignored because this controller only supports {}",
                    target
                ),
            )
        }
    })
}
