// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::conditions::{STATUS_FALSE, STATUS_TRUE};
use serde::{Deserialize, Serialize};

/// A status condition as written to Gateway API resources.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    /// Stamped when the status is written, never compared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    pub fn new(
        condition_type: &str,
        ok: bool,
        reason: &str,
        message: impl Into<String>,
        observed_generation: Option<i64>,
    ) -> Self {
        Self {
            condition_type: condition_type.to_string(),
            status: if ok { STATUS_TRUE } else { STATUS_FALSE }.to_string(),
            reason: reason.to_string(),
            message: message.into(),
            observed_generation,
            last_transition_time: None,
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == STATUS_TRUE
    }
}
