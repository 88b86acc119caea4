// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::grants::{RefFrom, RefTo, ReferenceGrantIndex};
use super::{BackendNode, BackendRefNode, Reason, RouteNode, Validity};
use crate::constants::{core, gateway_api};
use crate::events::NamespacedName;
use crate::sync::SnapshotStore;
use crate::types::http_route::HTTPBackendRef;
use std::collections::{BTreeMap, BTreeSet};

const DEFAULT_WEIGHT: i32 = 1;

/// Resolve one backend reference of a route in `route_namespace`.
pub(crate) fn resolve_backend_ref(
    route_namespace: &str,
    backend_ref: &HTTPBackendRef,
    store: &SnapshotStore,
    grants: &ReferenceGrantIndex<'_>,
) -> BackendRefNode {
    let target = NamespacedName::new(
        backend_ref.namespace.as_deref().unwrap_or(route_namespace),
        backend_ref.name.as_str(),
    );

    BackendRefNode {
        validity: check_backend_ref(route_namespace, backend_ref, &target, store, grants),
        target,
        port: backend_ref.port,
        weight: backend_ref.weight.unwrap_or(DEFAULT_WEIGHT),
    }
}

fn check_backend_ref(
    route_namespace: &str,
    backend_ref: &HTTPBackendRef,
    target: &NamespacedName,
    store: &SnapshotStore,
    grants: &ReferenceGrantIndex<'_>,
) -> Validity {
    let group = backend_ref.group.as_deref().unwrap_or(core::GROUP);
    let kind = backend_ref.kind.as_deref().unwrap_or(core::SERVICE_KIND);
    if group != core::GROUP || kind != core::SERVICE_KIND {
        return Validity::invalid(
            Reason::InvalidKind,
            format!("unsupported backend kind {}/{}", group, kind),
        );
    }

    let from = RefFrom {
        group: gateway_api::GROUP,
        kind: gateway_api::HTTP_ROUTE_KIND,
        namespace: route_namespace,
    };
    let to = RefTo {
        group: core::GROUP,
        kind: core::SERVICE_KIND,
        name: target,
    };
    if !grants.allows(&from, &to) {
        return Validity::invalid(
            Reason::RefNotPermitted,
            format!("reference to Service {} not permitted by any ReferenceGrant", target),
        );
    }

    let Some(service) = store.services.get(target) else {
        return Validity::invalid(
            Reason::BackendNotFound,
            format!("Service {} does not exist", target),
        );
    };

    let Some(port) = backend_ref.port else {
        return Validity::invalid(
            Reason::UnsupportedValue,
            format!("backend reference to Service {} requires a port", target),
        );
    };

    if !service_ports(service).contains(&port) {
        return Validity::invalid(
            Reason::UnsupportedValue,
            format!("Service {} does not expose port {}", target, port),
        );
    }

    Validity::Valid
}

fn service_ports(service: &k8s_openapi::api::core::v1::Service) -> BTreeSet<i32> {
    service
        .spec
        .as_ref()
        .and_then(|s| s.ports.as_ref())
        .map(|ports| ports.iter().map(|p| p.port).collect())
        .unwrap_or_default()
}

/// Services referenced by valid backend refs, with the ports in use and the routes using them.
pub(crate) fn collect_backends(
    routes: &BTreeMap<NamespacedName, RouteNode>,
) -> BTreeMap<NamespacedName, BackendNode> {
    let mut backends: BTreeMap<NamespacedName, BackendNode> = BTreeMap::new();

    for (route_name, route) in routes {
        for backend_ref in route.backend_refs().filter(|b| b.validity.is_valid()) {
            let node = backends
                .entry(backend_ref.target.clone())
                .or_insert_with(|| BackendNode {
                    name: backend_ref.target.clone(),
                    ports: BTreeSet::new(),
                    referenced_by: BTreeSet::new(),
                });
            if let Some(port) = backend_ref.port {
                node.ports.insert(port);
            }
            node.referenced_by.insert(route_name.clone());
        }
    }

    backends
}
