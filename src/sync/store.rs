// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Latest known state of every tracked resource, owned by the sync manager.

use crate::events::{Event, NamespacedName, Resource, ResourceKind};
use crate::types::{Gateway, HTTPRoute, ReferenceGrant};
use k8s_openapi::api::core::v1::{Secret, Service};
use std::collections::BTreeMap;

/// Snapshot of all tracked resources, keyed per kind by namespaced name.
///
/// Only mutated by applying events in arrival order; ordered maps keep graph builds deterministic.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    pub gateways: BTreeMap<NamespacedName, Gateway>,
    pub http_routes: BTreeMap<NamespacedName, HTTPRoute>,
    pub services: BTreeMap<NamespacedName, Service>,
    pub reference_grants: BTreeMap<NamespacedName, ReferenceGrant>,
    pub secrets: BTreeMap<NamespacedName, Secret>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Upserts replace the previous object, deletes remove it.
    pub fn apply(&mut self, event: Event) {
        match event {
            Event::Upsert(resource) => {
                let name = resource.namespaced_name();
                match resource {
                    Resource::Gateway(o) => {
                        self.gateways.insert(name, o);
                    }
                    Resource::HTTPRoute(o) => {
                        self.http_routes.insert(name, o);
                    }
                    Resource::Service(o) => {
                        self.services.insert(name, o);
                    }
                    Resource::ReferenceGrant(o) => {
                        self.reference_grants.insert(name, o);
                    }
                    Resource::Secret(o) => {
                        self.secrets.insert(name, o);
                    }
                }
            }
            Event::Delete { kind, name } => match kind {
                ResourceKind::Gateway => {
                    self.gateways.remove(&name);
                }
                ResourceKind::HTTPRoute => {
                    self.http_routes.remove(&name);
                }
                ResourceKind::Service => {
                    self.services.remove(&name);
                }
                ResourceKind::ReferenceGrant => {
                    self.reference_grants.remove(&name);
                }
                ResourceKind::Secret => {
                    self.secrets.remove(&name);
                }
            },
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.gateways.len()
            + self.http_routes.len()
            + self.services.len()
            + self.reference_grants.len()
            + self.secrets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TrackedKind;
    use crate::test_utils::make_service;

    fn upsert_service(ports: &[i32]) -> Event {
        Event::Upsert(make_service("apps", "cart", ports).into_resource())
    }

    fn delete_service() -> Event {
        Event::Delete {
            kind: ResourceKind::Service,
            name: NamespacedName::new("apps", "cart"),
        }
    }

    fn stored_ports(store: &SnapshotStore) -> Option<Vec<i32>> {
        store
            .services
            .get(&NamespacedName::new("apps", "cart"))
            .map(|s| {
                s.spec
                    .as_ref()
                    .and_then(|spec| spec.ports.as_ref())
                    .map(|ports| ports.iter().map(|p| p.port).collect())
                    .unwrap_or_default()
            })
    }

    #[test]
    fn test_last_write_wins_for_one_identity() {
        let sequences: Vec<(Vec<Event>, Option<Vec<i32>>)> = vec![
            (vec![upsert_service(&[80])], Some(vec![80])),
            (vec![upsert_service(&[80]), delete_service()], None),
            (
                vec![upsert_service(&[80]), delete_service(), upsert_service(&[81])],
                Some(vec![81]),
            ),
            (
                vec![delete_service(), upsert_service(&[80]), upsert_service(&[82])],
                Some(vec![82]),
            ),
            (vec![delete_service(), delete_service()], None),
        ];

        for (events, expected) in sequences {
            let mut store = SnapshotStore::new();
            for event in events {
                store.apply(event);
            }
            assert_eq!(stored_ports(&store), expected);
        }
    }

    #[test]
    fn test_delete_only_affects_its_kind() {
        let mut store = SnapshotStore::new();
        store.apply(upsert_service(&[80]));
        store.apply(Event::Delete {
            kind: ResourceKind::Secret,
            name: NamespacedName::new("apps", "cart"),
        });

        assert!(store.services.contains_key(&NamespacedName::new("apps", "cart")));
        assert_eq!(store.len(), 1);
    }
}
