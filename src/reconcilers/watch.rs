// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Watch runner - feeds watch notifications for one resource kind into its adapter.

use crate::constants::retry::{INITIAL_DELAY_SECS, MAX_ATTEMPTS, MAX_DELAY_SECS};
use crate::events::{NamespacedName, TrackedKind};
use crate::reconcilers::implementation::{Adapter, Outcome};
use futures::StreamExt;
use kube::runtime::WatchStreamExt;
use kube::{Api, Client};
use kube_runtime::watcher::{self, Config as WatcherConfig};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument, Span};

/// Build the API handle for a kind, scoped to one namespace when given.
pub fn watch_api<K>(client: Client, namespace: Option<&str>) -> Api<K>
where
    K: TrackedKind<Scope = k8s_openapi::NamespaceResourceScope>,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

pub struct Reconciler<K: TrackedKind> {
    api: Api<K>,
    adapter: Adapter<K>,
    span: Span,
}

impl<K: TrackedKind> Reconciler<K> {
    pub fn new(api: Api<K>, adapter: Adapter<K>, span: Span) -> Self {
        Self { api, adapter, span }
    }

    pub async fn run(self, cancel: CancellationToken) -> anyhow::Result<()> {
        let span = self.span.clone();
        self.watch(cancel).instrument(span).await;
        Ok(())
    }

    async fn watch(self, cancel: CancellationToken) {
        info!("Starting {} reconciler", K::KIND);

        let stream = watcher::watcher(self.api.clone(), WatcherConfig::default()).default_backoff();
        futures::pin_mut!(stream);

        let mut tracker = RelistTracker::default();

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => break,
                next = stream.next() => next,
            };

            let names = match next {
                None => break,
                Some(Err(e)) => {
                    warn!("Watch error: {}", e);
                    continue;
                }
                Some(Ok(event)) => tracker.observe(event),
            };

            for name in names {
                if cancel.is_cancelled() {
                    break;
                }
                self.reconcile_with_retry(&name, &cancel).await;
            }
        }

        info!("{} reconciler stopped", K::KIND);
    }

    /// Transient errors are retried in place with exponential backoff, racing cancellation.
    async fn reconcile_with_retry(&self, name: &NamespacedName, cancel: &CancellationToken) {
        let mut delay = INITIAL_DELAY_SECS;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.adapter.reconcile(name, cancel).await {
                Ok(Outcome::Cancelled) => return,
                Ok(outcome) => {
                    debug!("Reconciled {} {}: {:?}", K::KIND, name, outcome);
                    return;
                }
                Err(e) if attempt == MAX_ATTEMPTS => {
                    error!(
                        "Giving up on {} {} after {} attempts: {}",
                        K::KIND,
                        name,
                        attempt,
                        e
                    );
                }
                Err(e) => {
                    warn!(
                        "Reconciliation error for {} {}: {}, retrying in {} seconds...",
                        K::KIND,
                        name,
                        e,
                        delay
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = sleep(Duration::from_secs(delay)) => {}
                    }
                    delay = (delay * 2).min(MAX_DELAY_SECS);
                }
            }
        }
    }
}

/// Turns raw watcher events into the identities to reconcile.
///
/// A re-list does not report objects deleted while the watch was down, so identities known
/// before the re-list but absent from it are reconciled too (and resolve to deletions).
#[derive(Default)]
struct RelistTracker {
    known: HashSet<NamespacedName>,
    relisted: Option<HashSet<NamespacedName>>,
}

impl RelistTracker {
    fn observe<K: TrackedKind>(&mut self, event: watcher::Event<K>) -> Vec<NamespacedName> {
        match event {
            watcher::Event::Apply(obj) => {
                let name = NamespacedName::from_resource(&obj);
                self.known.insert(name.clone());
                vec![name]
            }
            watcher::Event::Delete(obj) => {
                let name = NamespacedName::from_resource(&obj);
                self.known.remove(&name);
                vec![name]
            }
            watcher::Event::Init => {
                self.relisted = Some(HashSet::new());
                vec![]
            }
            watcher::Event::InitApply(obj) => {
                let name = NamespacedName::from_resource(&obj);
                if let Some(relisted) = self.relisted.as_mut() {
                    relisted.insert(name.clone());
                }
                self.known.insert(name.clone());
                vec![name]
            }
            watcher::Event::InitDone => {
                let relisted = self.relisted.take().unwrap_or_default();
                let mut vanished: Vec<NamespacedName> =
                    self.known.difference(&relisted).cloned().collect();
                vanished.sort();
                self.known = relisted;
                vanished
            }
        }
    }
}
