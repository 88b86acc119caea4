// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Status reporting - maps graph validity to Gateway API status conditions.

pub mod conditions;
pub mod reporter;

pub use conditions::build_statuses;
pub use reporter::{KubeStatusSink, ReportSummary, StatusReporter, StatusSink};

use crate::constants::conditions::CONFLICTED;
use crate::events::{NamespacedName, ResourceKind};
use crate::types::{Condition, GatewayStatus, HTTPRouteStatus};
use std::fmt;

/// Identity of a resource whose status is written
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusKey {
    pub kind: ResourceKind,
    pub name: NamespacedName,
}

impl StatusKey {
    pub fn new(kind: ResourceKind, name: NamespacedName) -> Self {
        Self { kind, name }
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceStatus {
    Gateway(GatewayStatus),
    HTTPRoute(HTTPRouteStatus),
}

/// Summary of a resource's conditions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected { reason: String, message: String },
}

impl ResourceStatus {
    pub fn conditions(&self) -> Vec<&Condition> {
        match self {
            ResourceStatus::Gateway(s) => s
                .conditions
                .iter()
                .chain(s.listeners.iter().flat_map(|l| l.conditions.iter()))
                .collect(),
            ResourceStatus::HTTPRoute(s) => {
                s.parents.iter().flat_map(|p| p.conditions.iter()).collect()
            }
        }
    }

    /// Accepted when no condition fails, otherwise the first failing condition.
    /// `Conflicted` fails when true, every other condition when false.
    pub fn verdict(&self) -> Verdict {
        let failing = self.conditions().into_iter().find(|c| {
            if c.condition_type == CONFLICTED {
                c.is_true()
            } else {
                !c.is_true()
            }
        });

        match failing {
            None => Verdict::Accepted,
            Some(c) => Verdict::Rejected {
                reason: c.reason.clone(),
                message: c.message.clone(),
            },
        }
    }
}
