// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::{ResourceStatus, StatusKey};
use crate::constants::conditions::{
    ACCEPTED, CONFLICTED, REASON_ACCEPTED, REASON_LISTENERS_NOT_VALID, REASON_NO_CONFLICTS,
    REASON_RESOLVED_REFS, RESOLVED_REFS,
};
use crate::constants::gateway_api::{GROUP, HTTP_ROUTE_KIND};
use crate::events::ResourceKind;
use crate::graph::{GatewayNode, Graph, ListenerNode, Reason, RouteNode, Validity};
use crate::types::{
    Condition, GatewayStatus, HTTPRouteStatus, ListenerStatus, RouteGroupKind, RouteParentStatus,
};
use std::collections::BTreeMap;

/// Compute the desired status of every Gateway and attached-or-not HTTPRoute in the graph.
/// Routes without parent references to our Gateways get no status.
pub fn build_statuses(graph: &Graph, controller_name: &str) -> BTreeMap<StatusKey, ResourceStatus> {
    let gateways = graph.gateways.iter().map(|(name, gateway)| {
        (
            StatusKey::new(ResourceKind::Gateway, name.clone()),
            ResourceStatus::Gateway(gateway_status(gateway)),
        )
    });

    let routes = graph
        .routes
        .iter()
        .filter(|(_, route)| !route.parent_refs.is_empty())
        .map(|(name, route)| {
            (
                StatusKey::new(ResourceKind::HTTPRoute, name.clone()),
                ResourceStatus::HTTPRoute(route_status(route, controller_name)),
            )
        });

    gateways.chain(routes).collect()
}

fn gateway_status(gateway: &GatewayNode) -> GatewayStatus {
    let generation = gateway.generation;
    let all_invalid =
        !gateway.listeners.is_empty() && gateway.listeners.iter().all(|l| !l.validity.is_valid());

    let accepted = if all_invalid {
        Condition::new(
            ACCEPTED,
            false,
            REASON_LISTENERS_NOT_VALID,
            "none of the listeners are valid",
            generation,
        )
    } else {
        Condition::new(ACCEPTED, true, REASON_ACCEPTED, "Gateway is accepted", generation)
    };

    GatewayStatus {
        conditions: vec![accepted],
        listeners: gateway
            .listeners
            .iter()
            .map(|l| listener_status(l, generation))
            .collect(),
    }
}

fn listener_status(listener: &ListenerNode, generation: Option<i64>) -> ListenerStatus {
    let (reason, message) = match &listener.validity {
        Validity::Valid => (None, ""),
        Validity::Invalid { reason, message } => (Some(*reason), message.as_str()),
    };

    let accepted = match reason {
        Some(r @ (Reason::UnsupportedProtocol | Reason::HostnameConflict)) => {
            Condition::new(ACCEPTED, false, r.as_str(), message, generation)
        }
        _ => Condition::new(ACCEPTED, true, REASON_ACCEPTED, "Listener is accepted", generation),
    };

    let resolved_refs = match reason {
        Some(r @ (Reason::InvalidCertificateRef | Reason::RefNotPermitted)) => {
            Condition::new(RESOLVED_REFS, false, r.as_str(), message, generation)
        }
        _ => Condition::new(
            RESOLVED_REFS,
            true,
            REASON_RESOLVED_REFS,
            "All references are resolved",
            generation,
        ),
    };

    let conflicted = match reason {
        Some(r @ Reason::HostnameConflict) => {
            Condition::new(CONFLICTED, true, r.as_str(), message, generation)
        }
        _ => Condition::new(CONFLICTED, false, REASON_NO_CONFLICTS, "No conflicts", generation),
    };

    let supported_kinds = match listener.protocol.as_str() {
        "HTTP" | "HTTPS" => vec![RouteGroupKind {
            group: Some(GROUP.to_string()),
            kind: HTTP_ROUTE_KIND.to_string(),
        }],
        _ => Vec::new(),
    };

    ListenerStatus {
        name: listener.name.clone(),
        supported_kinds,
        attached_routes: i32::try_from(listener.attached_routes.len()).unwrap_or(i32::MAX),
        conditions: vec![accepted, resolved_refs, conflicted],
    }
}

fn route_status(route: &RouteNode, controller_name: &str) -> HTTPRouteStatus {
    let generation = route.generation;

    let first_invalid = route.backend_refs().find_map(|b| match &b.validity {
        Validity::Invalid { reason, message } => Some((*reason, message.as_str())),
        Validity::Valid => None,
    });

    let resolved_refs = match first_invalid {
        Some((reason, message)) => {
            Condition::new(RESOLVED_REFS, false, reason.as_str(), message, generation)
        }
        None => Condition::new(
            RESOLVED_REFS,
            true,
            REASON_RESOLVED_REFS,
            "All references are resolved",
            generation,
        ),
    };

    let parents = route
        .parent_refs
        .iter()
        .map(|parent| {
            let accepted = match &parent.validity {
                Validity::Valid => {
                    Condition::new(ACCEPTED, true, REASON_ACCEPTED, "Route is accepted", generation)
                }
                Validity::Invalid { reason, message } => {
                    Condition::new(ACCEPTED, false, reason.as_str(), message.as_str(), generation)
                }
            };
            RouteParentStatus {
                parent_ref: parent.parent_ref.clone(),
                controller_name: controller_name.to_string(),
                conditions: vec![accepted, resolved_refs.clone()],
            }
        })
        .collect();

    HTTPRouteStatus { parents }
}
