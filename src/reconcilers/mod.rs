// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes reconcilers that react to watch events.

pub mod implementation;
pub mod watch;

pub use implementation::{single_resource_filter, Adapter, AdapterConfig, NamespacedNameFilter, Outcome};
pub use watch::{watch_api, Reconciler};
