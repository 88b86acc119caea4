// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Relationship graph - resolves the cross-references between tracked resources.
//!
//! The graph is rebuilt from scratch from the snapshot store on every cycle. Building is a pure
//! function of the snapshot: invalid references are annotated on the node they belong to and
//! never abort the build, so one broken resource cannot hold back the rest.

mod backend;
mod gateway;
mod grants;
mod hostname;
mod route;

use crate::events::NamespacedName;
use crate::sync::SnapshotStore;
use crate::types::ParentReference;
use std::collections::{BTreeMap, BTreeSet};

/// Why a node or reference is invalid. Strings follow Gateway API condition reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    HostnameConflict,
    UnsupportedProtocol,
    InvalidCertificateRef,
    RefNotPermitted,
    BackendNotFound,
    InvalidKind,
    UnsupportedValue,
    NoMatchingParent,
    NotAllowedByListeners,
    NoMatchingListenerHostname,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::HostnameConflict => "HostnameConflict",
            Reason::UnsupportedProtocol => "UnsupportedProtocol",
            Reason::InvalidCertificateRef => "InvalidCertificateRef",
            Reason::RefNotPermitted => "RefNotPermitted",
            Reason::BackendNotFound => "BackendNotFound",
            Reason::InvalidKind => "InvalidKind",
            Reason::UnsupportedValue => "UnsupportedValue",
            Reason::NoMatchingParent => "NoMatchingParent",
            Reason::NotAllowedByListeners => "NotAllowedByListeners",
            Reason::NoMatchingListenerHostname => "NoMatchingListenerHostname",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid { reason: Reason, message: String },
}

impl Validity {
    pub fn invalid(reason: Reason, message: impl Into<String>) -> Self {
        Validity::Invalid {
            reason,
            message: message.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }

    pub fn reason(&self) -> Option<Reason> {
        match self {
            Validity::Valid => None,
            Validity::Invalid { reason, .. } => Some(*reason),
        }
    }
}

/// Which namespaces may attach routes to a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowedNamespaces {
    Same,
    All,
    /// Label selectors are not supported and match nothing
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayNode {
    pub name: NamespacedName,
    pub generation: Option<i64>,
    /// Listeners in declaration order
    pub listeners: Vec<ListenerNode>,
}

impl GatewayNode {
    pub fn listener(&self, name: &str) -> Option<&ListenerNode> {
        self.listeners.iter().find(|l| l.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerNode {
    pub name: String,
    pub protocol: String,
    pub port: i32,
    pub hostname: Option<String>,
    pub allowed_namespaces: AllowedNamespaces,
    /// Resolved certificate for HTTPS listeners
    pub tls_secret: Option<NamespacedName>,
    pub validity: Validity,
    pub attached_routes: BTreeSet<NamespacedName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteNode {
    pub name: NamespacedName,
    pub generation: Option<i64>,
    pub hostnames: Vec<String>,
    /// Parent references to Gateways handled by this controller
    pub parent_refs: Vec<ParentRefNode>,
    pub rules: Vec<RuleNode>,
}

impl RouteNode {
    pub fn is_attached(&self) -> bool {
        self.parent_refs.iter().any(|p| !p.attached_listeners.is_empty())
    }

    pub fn backend_refs(&self) -> impl Iterator<Item = &BackendRefNode> {
        self.rules.iter().flat_map(|r| r.backend_refs.iter())
    }

    /// First invalid backend reference, if any
    pub fn first_invalid_backend_ref(&self) -> Option<&BackendRefNode> {
        self.backend_refs().find(|b| !b.validity.is_valid())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRefNode {
    /// Position in the route's `parentRefs`
    pub index: usize,
    pub parent_ref: ParentReference,
    pub gateway: NamespacedName,
    /// Names of the listeners the route attached to through this reference
    pub attached_listeners: Vec<String>,
    /// Why the route did not attach, when `attached_listeners` is empty
    pub validity: Validity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleNode {
    pub matches: Vec<PathMatch>,
    pub backend_refs: Vec<BackendRefNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    pub match_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRefNode {
    pub target: NamespacedName,
    pub port: Option<i32>,
    pub weight: i32,
    pub validity: Validity,
}

/// A Service referenced by at least one valid backend reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendNode {
    pub name: NamespacedName,
    pub ports: BTreeSet<i32>,
    pub referenced_by: BTreeSet<NamespacedName>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    pub gateways: BTreeMap<NamespacedName, GatewayNode>,
    pub routes: BTreeMap<NamespacedName, RouteNode>,
    pub backends: BTreeMap<NamespacedName, BackendNode>,
}

/// Build the graph for the Gateways of `gateway_class_name` from a snapshot.
pub fn build(store: &SnapshotStore, gateway_class_name: &str) -> Graph {
    let grants = grants::ReferenceGrantIndex::new(store.reference_grants.values());

    let mut gateways: BTreeMap<NamespacedName, GatewayNode> = store
        .gateways
        .iter()
        .filter(|(_, gw)| gw.spec.gateway_class_name == gateway_class_name)
        .map(|(name, gw)| (name.clone(), gateway::build_gateway(name, gw, store, &grants)))
        .collect();

    let routes: BTreeMap<NamespacedName, RouteNode> = store
        .http_routes
        .iter()
        .map(|(name, route)| {
            (
                name.clone(),
                route::build_route(name, route, &mut gateways, store, &grants),
            )
        })
        .collect();

    let backends = backend::collect_backends(&routes);

    Graph {
        gateways,
        routes,
        backends,
    }
}
