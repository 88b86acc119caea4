// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD discovery, resource fetching and event recording.

pub mod crd;
pub mod getter;
pub mod recorder;

pub use crd::wait_for_gateway_api_crds;
pub use getter::{Getter, KubeGetter};
pub use recorder::{EventRecorder, KubeEventRecorder};
