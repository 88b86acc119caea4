// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Snapshot store and the event loop that owns it.

pub mod manager;
pub mod store;

pub use manager::{LoopState, SyncManager, SyncManagerHandle, SyncSettings};
pub use store::SnapshotStore;
