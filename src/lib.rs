// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod config;
pub mod constants;
pub mod dataplane;
pub mod error;
pub mod events;
pub mod graph;
pub mod kubernetes;
pub mod reconcilers;
pub mod status;
pub mod sync;
pub mod types;
pub mod validation;

#[cfg(test)]
pub mod test_utils;
