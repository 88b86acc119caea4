// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Gateway API custom resources watched by the controller.

pub mod condition;
pub mod gateway;
pub mod http_route;
pub mod reference_grant;

pub use condition::Condition;
pub use gateway::{Gateway, GatewayStatus, Listener, ListenerStatus, RouteGroupKind};
pub use http_route::{HTTPRoute, HTTPRouteStatus, ParentReference, RouteParentStatus};
pub use reference_grant::ReferenceGrant;

use serde::{Deserialize, Serialize};

/// A typed reference to another object, e.g. a listener's certificate ref.
#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}
