// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Boundary to the data plane: renders the resolved graph into a proxy-neutral configuration
//! model and hands it to an applier.

pub mod file;

pub use file::FileApplier;

use crate::error::Result;
use crate::events::NamespacedName;
use crate::graph::{Graph, ListenerNode, RouteNode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Applies a rendered configuration to the running proxy.
#[async_trait]
pub trait ConfigApplier: Send + Sync {
    async fn apply(&self, config: &DataplaneConfig) -> Result<()>;
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DataplaneConfig {
    pub servers: Vec<Server>,
}

/// One valid listener of a Gateway
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub gateway: String,
    pub listener: String,
    pub port: i32,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_secret: Option<String>,
    pub routes: Vec<Route>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub name: String,
    pub hostnames: Vec<String>,
    pub rules: Vec<Rule>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub matches: Vec<Match>,
    pub upstreams: Vec<Upstream>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    #[serde(rename = "type")]
    pub match_type: String,
    pub path: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Upstream {
    pub service: String,
    pub port: i32,
    pub weight: i32,
}

impl DataplaneConfig {
    /// Render the valid subset of a graph. Invalid listeners and backend references are left out;
    /// a rule without valid upstreams is kept so the proxy answers it with an error.
    pub fn from_graph(graph: &Graph) -> Self {
        let servers = graph
            .gateways
            .values()
            .flat_map(|gateway| {
                gateway
                    .listeners
                    .iter()
                    .filter(|l| l.validity.is_valid())
                    .map(move |l| server(&gateway.name, l, graph))
            })
            .collect();

        Self { servers }
    }

    /// Whether any server routes traffic to the given Service
    pub fn routes_to(&self, service: &NamespacedName) -> bool {
        let service = service.to_string();
        self.servers
            .iter()
            .flat_map(|s| s.routes.iter())
            .flat_map(|r| r.rules.iter())
            .flat_map(|r| r.upstreams.iter())
            .any(|u| u.service == service)
    }
}

fn server(gateway: &NamespacedName, listener: &ListenerNode, graph: &Graph) -> Server {
    let routes = listener
        .attached_routes
        .iter()
        .filter_map(|name| graph.routes.get(name))
        .map(route)
        .collect();

    Server {
        gateway: gateway.to_string(),
        listener: listener.name.clone(),
        port: listener.port,
        protocol: listener.protocol.clone(),
        hostname: listener.hostname.clone(),
        tls_secret: listener.tls_secret.as_ref().map(|s| s.to_string()),
        routes,
    }
}

fn route(node: &RouteNode) -> Route {
    let rules = node
        .rules
        .iter()
        .map(|rule| Rule {
            matches: rule
                .matches
                .iter()
                .map(|m| Match {
                    match_type: m.match_type.clone(),
                    path: m.value.clone(),
                })
                .collect(),
            upstreams: rule
                .backend_refs
                .iter()
                .filter(|b| b.validity.is_valid())
                .filter_map(|b| {
                    b.port.map(|port| Upstream {
                        service: b.target.to_string(),
                        port,
                        weight: b.weight,
                    })
                })
                .collect(),
        })
        .collect();

    Route {
        name: node.name.to_string(),
        hostnames: node.hostnames.clone(),
        rules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, ResourceKind, TrackedKind};
    use crate::graph;
    use crate::sync::SnapshotStore;
    use crate::test_utils::{
        backend_ref, make_gateway, make_route, make_service, parent_ref, TEST_GATEWAY_CLASS,
    };

    fn store() -> SnapshotStore {
        let mut store = SnapshotStore::new();
        store.apply(Event::Upsert(
            make_gateway(
                "default",
                "g1",
                &[("http", "HTTP", 80, None), ("dup-a", "HTTP", 81, None), ("dup-b", "HTTP", 81, None)],
            )
            .into_resource(),
        ));
        store.apply(Event::Upsert(
            make_route(
                "default",
                "r1",
                &[parent_ref("default", "g1", None)],
                &[backend_ref(None, "b1", Some(8080)), backend_ref(None, "b2", Some(8080))],
            )
            .into_resource(),
        ));
        store.apply(Event::Upsert(make_service("default", "b1", &[8080]).into_resource()));
        store
    }

    #[test]
    fn test_renders_valid_listeners_and_upstreams() {
        let config = DataplaneConfig::from_graph(&graph::build(&store(), TEST_GATEWAY_CLASS));

        assert_eq!(config.servers.len(), 1);
        let server = &config.servers[0];
        assert_eq!(server.gateway, "default/g1");
        assert_eq!(server.port, 80);
        assert_eq!(server.routes.len(), 1);

        let rule = &server.routes[0].rules[0];
        assert_eq!(rule.matches[0].path, "/");
        assert_eq!(
            rule.upstreams,
            vec![Upstream {
                service: "default/b1".to_string(),
                port: 8080,
                weight: 1,
            }]
        );
        assert!(config.routes_to(&NamespacedName::new("default", "b1")));
        assert!(!config.routes_to(&NamespacedName::new("default", "b2")));
    }

    #[test]
    fn test_deleted_backend_is_no_longer_routed() {
        let mut store = store();
        store.apply(Event::Delete {
            kind: ResourceKind::Service,
            name: NamespacedName::new("default", "b1"),
        });

        let config = DataplaneConfig::from_graph(&graph::build(&store, TEST_GATEWAY_CLASS));

        assert!(!config.routes_to(&NamespacedName::new("default", "b1")));
        assert!(config.servers[0].routes[0].rules[0].upstreams.is_empty());
    }

    #[test]
    fn test_serializes_camel_case() {
        let config = DataplaneConfig::from_graph(&graph::build(&store(), TEST_GATEWAY_CLASS));
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["servers"][0]["routes"][0]["rules"][0]["matches"][0]["type"], "PathPrefix");
        assert!(json["servers"][0].get("tlsSecret").is_none());
    }
}
