// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::backend::resolve_backend_ref;
use super::grants::ReferenceGrantIndex;
use super::hostname::hostnames_intersect;
use super::{
    AllowedNamespaces, GatewayNode, ListenerNode, ParentRefNode, PathMatch, Reason, RouteNode,
    RuleNode, Validity,
};
use crate::constants::gateway_api;
use crate::events::NamespacedName;
use crate::sync::SnapshotStore;
use crate::types::http_route::{HTTPRouteMatch, HTTPRouteRule};
use crate::types::{HTTPRoute, ParentReference};
use std::collections::BTreeMap;

const DEFAULT_MATCH_TYPE: &str = "PathPrefix";
const DEFAULT_PATH: &str = "/";

/// Resolve a route against the Gateways in the graph, attaching it to every listener that
/// accepts it.
pub(crate) fn build_route(
    name: &NamespacedName,
    route: &HTTPRoute,
    gateways: &mut BTreeMap<NamespacedName, GatewayNode>,
    store: &SnapshotStore,
    grants: &ReferenceGrantIndex<'_>,
) -> RouteNode {
    let mut parent_refs = Vec::new();

    for (index, parent_ref) in route.spec.parent_refs.iter().enumerate() {
        if !is_gateway_ref(parent_ref) {
            continue;
        }

        let gateway_name = NamespacedName::new(
            parent_ref.namespace.as_deref().unwrap_or(&name.namespace),
            parent_ref.name.as_str(),
        );

        let (attached_listeners, validity) = match gateways.get_mut(&gateway_name) {
            Some(gateway) => attach(name, &route.spec.hostnames, parent_ref, gateway),
            // Gateways of other classes belong to another controller
            None if store.gateways.contains_key(&gateway_name) => continue,
            None => (
                Vec::new(),
                Validity::invalid(
                    Reason::NoMatchingParent,
                    format!("Gateway {} does not exist", gateway_name),
                ),
            ),
        };

        parent_refs.push(ParentRefNode {
            index,
            parent_ref: parent_ref.clone(),
            gateway: gateway_name,
            attached_listeners,
            validity,
        });
    }

    let rules = route
        .spec
        .rules
        .iter()
        .map(|rule| build_rule(&name.namespace, rule, store, grants))
        .collect();

    RouteNode {
        name: name.clone(),
        generation: route.metadata.generation,
        hostnames: route.spec.hostnames.clone(),
        parent_refs,
        rules,
    }
}

fn is_gateway_ref(parent_ref: &ParentReference) -> bool {
    parent_ref.group.as_deref().unwrap_or(gateway_api::GROUP) == gateway_api::GROUP
        && parent_ref.kind.as_deref().unwrap_or(gateway_api::GATEWAY_KIND)
            == gateway_api::GATEWAY_KIND
}

fn attach(
    route: &NamespacedName,
    hostnames: &[String],
    parent_ref: &ParentReference,
    gateway: &mut GatewayNode,
) -> (Vec<String>, Validity) {
    let gateway_namespace = gateway.name.namespace.clone();
    let mut attached = Vec::new();
    let mut namespace_rejected = false;
    let mut hostname_rejected = false;

    for listener in gateway
        .listeners
        .iter_mut()
        .filter(|l| selects(parent_ref, l) && l.validity.is_valid())
    {
        if !namespace_allowed(listener.allowed_namespaces, &gateway_namespace, &route.namespace) {
            namespace_rejected = true;
            continue;
        }
        if !hostnames_intersect(listener.hostname.as_deref(), hostnames) {
            hostname_rejected = true;
            continue;
        }
        listener.attached_routes.insert(route.clone());
        attached.push(listener.name.clone());
    }

    let validity = if !attached.is_empty() {
        Validity::Valid
    } else if hostname_rejected {
        Validity::invalid(
            Reason::NoMatchingListenerHostname,
            "no listener hostname matches the route hostnames",
        )
    } else if namespace_rejected {
        Validity::invalid(
            Reason::NotAllowedByListeners,
            format!("no listener allows routes from namespace {}", route.namespace),
        )
    } else {
        Validity::invalid(
            Reason::NoMatchingParent,
            format!("no valid listener of Gateway {} matches the parent reference", gateway.name),
        )
    };

    (attached, validity)
}

fn selects(parent_ref: &ParentReference, listener: &ListenerNode) -> bool {
    parent_ref
        .section_name
        .as_deref()
        .map_or(true, |section| section == listener.name)
        && parent_ref.port.map_or(true, |port| port == listener.port)
}

fn namespace_allowed(allowed: AllowedNamespaces, gateway_ns: &str, route_ns: &str) -> bool {
    match allowed {
        AllowedNamespaces::All => true,
        AllowedNamespaces::Same => gateway_ns == route_ns,
        AllowedNamespaces::None => false,
    }
}

fn build_rule(
    route_namespace: &str,
    rule: &HTTPRouteRule,
    store: &SnapshotStore,
    grants: &ReferenceGrantIndex<'_>,
) -> RuleNode {
    let matches = if rule.matches.is_empty() {
        vec![default_match()]
    } else {
        rule.matches.iter().map(path_match).collect()
    };

    let backend_refs = rule
        .backend_refs
        .iter()
        .map(|b| resolve_backend_ref(route_namespace, b, store, grants))
        .collect();

    RuleNode {
        matches,
        backend_refs,
    }
}

fn default_match() -> PathMatch {
    PathMatch {
        match_type: DEFAULT_MATCH_TYPE.to_string(),
        value: DEFAULT_PATH.to_string(),
    }
}

fn path_match(m: &HTTPRouteMatch) -> PathMatch {
    let Some(path) = m.path.as_ref() else {
        return default_match();
    };
    PathMatch {
        match_type: path
            .match_type
            .clone()
            .unwrap_or_else(|| DEFAULT_MATCH_TYPE.to_string()),
        value: path.value.clone().unwrap_or_else(|| DEFAULT_PATH.to_string()),
    }
}
