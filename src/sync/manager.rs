// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Central coordinator: drains events from the reconcilers, rebuilds the graph and applies the
//! resulting configuration.
//!
//! The manager is the only owner of the snapshot store, so graph construction needs no locking.

use crate::config::Config;
use crate::dataplane::{ConfigApplier, DataplaneConfig};
use crate::error::{Result, WaypostError};
use crate::events::Event;
use crate::graph::{self, Graph};
use crate::status::StatusReporter;
use crate::sync::store::SnapshotStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn, Span};

const MIN_RESYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Where the event loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Draining,
    Rebuilding,
    Applying,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub gateway_class_name: String,
    pub event_channel_capacity: usize,
    pub batch_window: Duration,
    pub max_batch_size: usize,
    pub apply_timeout: Duration,
    pub resync_interval: Duration,
}

impl From<&Config> for SyncSettings {
    fn from(config: &Config) -> Self {
        Self {
            gateway_class_name: config.gateway_class_name.clone(),
            event_channel_capacity: config.event_channel_capacity,
            batch_window: config.batch_window,
            max_batch_size: config.max_batch_size,
            apply_timeout: config.apply_timeout,
            resync_interval: config.resync_interval,
        }
    }
}

/// Handle to send events to the SyncManager
#[derive(Clone)]
pub struct SyncManagerHandle {
    event_tx: mpsc::Sender<Event>,
}

impl SyncManagerHandle {
    pub fn from_sender(event_tx: mpsc::Sender<Event>) -> Self {
        Self { event_tx }
    }

    /// Send an event, giving up when `cancel` fires first.
    ///
    /// Returns `Ok(false)` when cancelled; nothing was sent in that case.
    pub async fn send(&self, event: Event, cancel: &CancellationToken) -> Result<bool> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(false),
            sent = self.event_tx.send(event) => match sent {
                Ok(()) => Ok(true),
                Err(e) => Err(WaypostError::ChannelClosed(format!(
                    "dropped {} event for {}",
                    e.0.kind(),
                    e.0.namespaced_name()
                ))),
            },
        }
    }
}

/// Outcome of one rebuild + apply cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleResult {
    Applied,
    Failed,
    Cancelled,
}

/// Single consumer of the event channel.
pub struct SyncManager {
    settings: SyncSettings,
    event_rx: mpsc::Receiver<Event>,
    store: SnapshotStore,
    applier: Arc<dyn ConfigApplier>,
    status: Option<StatusReporter>,
    state_tx: watch::Sender<LoopState>,
    /// Set when the last cycle must be redone on the next resync tick
    needs_resync: bool,
    span: Span,
}

impl SyncManager {
    pub fn new(
        settings: SyncSettings,
        applier: Arc<dyn ConfigApplier>,
        status: Option<StatusReporter>,
        span: Span,
    ) -> (Self, SyncManagerHandle) {
        let (event_tx, event_rx) = mpsc::channel(settings.event_channel_capacity.max(1));
        let (state_tx, _) = watch::channel(LoopState::Idle);

        let manager = Self {
            settings,
            event_rx,
            store: SnapshotStore::new(),
            applier,
            status,
            state_tx,
            needs_resync: false,
            span,
        };

        let handle = SyncManagerHandle { event_tx };
        (manager, handle)
    }

    /// Observe loop state transitions
    pub fn state(&self) -> watch::Receiver<LoopState> {
        self.state_tx.subscribe()
    }

    #[instrument(parent = &self.span, skip(self, cancel))]
    pub async fn run(mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        info!("SyncManager started, waiting for events...");

        let period = self.settings.resync_interval.max(MIN_RESYNC_INTERVAL);
        let mut resync = time::interval_at(Instant::now() + period, period);
        resync.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            self.set_state(LoopState::Idle);

            let first = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = self.event_rx.recv() => match event {
                    Some(event) => Some(event),
                    None => {
                        info!("All event senders are gone");
                        break;
                    }
                },
                _ = resync.tick() => None,
            };

            match first {
                Some(event) => {
                    self.set_state(LoopState::Draining);
                    if !self.drain(event, &cancel).await {
                        break;
                    }
                }
                None if self.needs_resync => {
                    info!("Retrying the previous cycle");
                }
                None => continue,
            }

            if self.cycle(&cancel).await == CycleResult::Cancelled {
                break;
            }
        }

        self.set_state(LoopState::Stopped);
        info!("SyncManager stopped");
        Ok(())
    }

    /// Apply the first event and everything that arrives within the batch window.
    ///
    /// Returns false when cancelled; the events drained so far stay in the store.
    async fn drain(&mut self, first: Event, cancel: &CancellationToken) -> bool {
        let deadline = Instant::now() + self.settings.batch_window;
        let mut count = 1;
        self.store.apply(first);

        while count < self.settings.max_batch_size {
            let next = match self.event_rx.try_recv() {
                Ok(event) => Some(event),
                Err(mpsc::error::TryRecvError::Empty) => tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(events = count, "Cancelled while draining");
                        return false;
                    }
                    received = time::timeout_at(deadline, self.event_rx.recv()) => received.unwrap_or(None),
                },
                Err(mpsc::error::TryRecvError::Disconnected) => None,
            };

            let Some(event) = next else {
                break;
            };
            self.store.apply(event);
            count += 1;
        }

        debug!(events = count, resources = self.store.len(), "Drained batch");
        true
    }

    async fn cycle(&mut self, cancel: &CancellationToken) -> CycleResult {
        self.set_state(LoopState::Rebuilding);
        let graph = graph::build(&self.store, &self.settings.gateway_class_name);
        let config = DataplaneConfig::from_graph(&graph);
        debug!(
            gateways = graph.gateways.len(),
            routes = graph.routes.len(),
            backends = graph.backends.len(),
            "Rebuilt graph"
        );

        self.set_state(LoopState::Applying);
        let applied = tokio::select! {
            biased;
            _ = cancel.cancelled() => return CycleResult::Cancelled,
            applied = time::timeout(self.settings.apply_timeout, self.applier.apply(&config)) => applied,
        };

        match applied {
            Ok(Ok(())) => {
                info!(servers = config.servers.len(), "Applied dataplane configuration");
                self.needs_resync = !self.report_status(&graph).await;
                CycleResult::Applied
            }
            Ok(Err(e)) => {
                error!(error = %e, "Failed to apply dataplane configuration");
                self.needs_resync = true;
                CycleResult::Failed
            }
            Err(_) => {
                error!(
                    timeout = ?self.settings.apply_timeout,
                    "Timed out applying dataplane configuration"
                );
                self.needs_resync = true;
                CycleResult::Failed
            }
        }
    }

    /// Returns false when some statuses could not be written
    async fn report_status(&mut self, graph: &Graph) -> bool {
        match self.status.as_mut() {
            Some(reporter) => {
                let summary = reporter.report(graph).await;
                if summary.failed > 0 {
                    warn!(failed = summary.failed, "Some statuses were not written");
                }
                summary.failed == 0
            }
            None => true,
        }
    }

    fn set_state(&self, state: LoopState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "Event loop state changed");
        }
    }
}
