// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::grants::{RefFrom, RefTo, ReferenceGrantIndex};
use super::{AllowedNamespaces, GatewayNode, ListenerNode, Reason, Validity};
use crate::constants::{core, gateway_api};
use crate::events::NamespacedName;
use crate::sync::SnapshotStore;
use crate::types::gateway::{Listener, ListenerTls};
use crate::types::Gateway;
use std::collections::{BTreeSet, HashMap};

const TLS_CERT_KEY: &str = "tls.crt";
const TLS_KEY_KEY: &str = "tls.key";

pub(crate) fn build_gateway(
    name: &NamespacedName,
    gateway: &Gateway,
    store: &SnapshotStore,
    grants: &ReferenceGrantIndex<'_>,
) -> GatewayNode {
    let mut listeners: Vec<ListenerNode> = gateway
        .spec
        .listeners
        .iter()
        .map(|l| build_listener(name, l, store, grants))
        .collect();

    mark_conflicts(&mut listeners);

    GatewayNode {
        name: name.clone(),
        generation: gateway.metadata.generation,
        listeners,
    }
}

fn build_listener(
    gateway: &NamespacedName,
    listener: &Listener,
    store: &SnapshotStore,
    grants: &ReferenceGrantIndex<'_>,
) -> ListenerNode {
    let (tls_secret, validity) = match listener.protocol.as_str() {
        "HTTP" => (None, Validity::Valid),
        "HTTPS" => match resolve_certificate(gateway, listener.tls.as_ref(), store, grants) {
            Ok(secret) => (Some(secret), Validity::Valid),
            Err(validity) => (None, validity),
        },
        other => (
            None,
            Validity::invalid(
                Reason::UnsupportedProtocol,
                format!("protocol {:?} is not supported", other),
            ),
        ),
    };

    let allowed_namespaces = match listener.allowed_namespaces_from() {
        "All" => AllowedNamespaces::All,
        "Same" => AllowedNamespaces::Same,
        _ => AllowedNamespaces::None,
    };

    ListenerNode {
        name: listener.name.clone(),
        protocol: listener.protocol.clone(),
        port: listener.port,
        hostname: listener.hostname.clone(),
        allowed_namespaces,
        tls_secret,
        validity,
        attached_routes: BTreeSet::new(),
    }
}

/// Listeners sharing protocol, port and hostname are all marked invalid; none of them wins.
fn mark_conflicts(listeners: &mut [ListenerNode]) {
    let mut counts: HashMap<(String, i32, String), usize> = HashMap::new();
    for l in listeners.iter() {
        *counts.entry(conflict_key(l)).or_default() += 1;
    }

    for l in listeners.iter_mut() {
        if counts[&conflict_key(l)] > 1 {
            l.validity = Validity::invalid(
                Reason::HostnameConflict,
                format!(
                    "another listener uses protocol {} on port {} with hostname {:?}",
                    l.protocol,
                    l.port,
                    l.hostname.as_deref().unwrap_or("")
                ),
            );
        }
    }
}

fn conflict_key(l: &ListenerNode) -> (String, i32, String) {
    (l.protocol.clone(), l.port, l.hostname.clone().unwrap_or_default())
}

fn resolve_certificate(
    gateway: &NamespacedName,
    tls: Option<&ListenerTls>,
    store: &SnapshotStore,
    grants: &ReferenceGrantIndex<'_>,
) -> Result<NamespacedName, Validity> {
    let Some(cert_ref) = tls.and_then(|t| t.certificate_refs.first()) else {
        return Err(Validity::invalid(
            Reason::InvalidCertificateRef,
            "HTTPS listener requires a certificate reference",
        ));
    };

    let group = cert_ref.group.as_deref().unwrap_or(core::GROUP);
    let kind = cert_ref.kind.as_deref().unwrap_or(core::SECRET_KIND);
    if group != core::GROUP || kind != core::SECRET_KIND {
        return Err(Validity::invalid(
            Reason::InvalidCertificateRef,
            format!("unsupported certificate reference kind {}/{}", group, kind),
        ));
    }

    let secret_name = NamespacedName::new(
        cert_ref.namespace.as_deref().unwrap_or(&gateway.namespace),
        cert_ref.name.as_str(),
    );

    let from = RefFrom {
        group: gateway_api::GROUP,
        kind: gateway_api::GATEWAY_KIND,
        namespace: &gateway.namespace,
    };
    let to = RefTo {
        group: core::GROUP,
        kind: core::SECRET_KIND,
        name: &secret_name,
    };
    if !grants.allows(&from, &to) {
        return Err(Validity::invalid(
            Reason::RefNotPermitted,
            format!("reference to Secret {} not permitted by any ReferenceGrant", secret_name),
        ));
    }

    let Some(secret) = store.secrets.get(&secret_name) else {
        return Err(Validity::invalid(
            Reason::InvalidCertificateRef,
            format!("Secret {} does not exist", secret_name),
        ));
    };

    let is_tls = secret.type_.as_deref() == Some(core::TLS_SECRET_TYPE)
        && secret
            .data
            .as_ref()
            .is_some_and(|d| d.contains_key(TLS_CERT_KEY) && d.contains_key(TLS_KEY_KEY));
    if !is_tls {
        return Err(Validity::invalid(
            Reason::InvalidCertificateRef,
            format!("Secret {} is not a valid TLS secret", secret_name),
        ));
    }

    Ok(secret_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, TrackedKind};
    use crate::test_utils::{make_gateway, make_reference_grant, make_tls_secret};
    use crate::types::ObjectRef;

    fn https_gateway(cert_namespace: Option<&str>) -> Gateway {
        let mut gateway = make_gateway("infra", "edge", &[("https", "HTTPS", 443, None)]);
        gateway.spec.listeners[0].tls = Some(ListenerTls {
            mode: None,
            certificate_refs: vec![ObjectRef {
                name: "cert".to_string(),
                namespace: cert_namespace.map(str::to_string),
                ..Default::default()
            }],
        });
        gateway
    }

    fn build(store: &SnapshotStore, gateway: &Gateway) -> GatewayNode {
        let grants = ReferenceGrantIndex::new(store.reference_grants.values());
        build_gateway(&NamespacedName::new("infra", "edge"), gateway, store, &grants)
    }

    #[test]
    fn test_https_listener_resolves_secret() {
        let mut store = SnapshotStore::new();
        store.apply(Event::Upsert(make_tls_secret("infra", "cert").into_resource()));

        let node = build(&store, &https_gateway(None));
        let listener = node.listener("https").unwrap();

        assert!(listener.validity.is_valid());
        assert_eq!(listener.tls_secret, Some(NamespacedName::new("infra", "cert")));
    }

    #[test]
    fn test_https_listener_missing_secret() {
        let node = build(&SnapshotStore::new(), &https_gateway(None));
        assert_eq!(
            node.listener("https").unwrap().validity.reason(),
            Some(Reason::InvalidCertificateRef)
        );
    }

    #[test]
    fn test_https_listener_without_certificate_refs() {
        let gateway = make_gateway("infra", "edge", &[("https", "HTTPS", 443, None)]);
        let node = build(&SnapshotStore::new(), &gateway);
        assert_eq!(
            node.listener("https").unwrap().validity.reason(),
            Some(Reason::InvalidCertificateRef)
        );
    }

    #[test]
    fn test_cross_namespace_secret_needs_grant() {
        let mut store = SnapshotStore::new();
        store.apply(Event::Upsert(make_tls_secret("certs", "cert").into_resource()));

        let node = build(&store, &https_gateway(Some("certs")));
        assert_eq!(
            node.listener("https").unwrap().validity.reason(),
            Some(Reason::RefNotPermitted)
        );

        store.apply(Event::Upsert(
            make_reference_grant("certs", "allow-edge", "Gateway", "infra", "Secret").into_resource(),
        ));
        let node = build(&store, &https_gateway(Some("certs")));
        assert!(node.listener("https").unwrap().validity.is_valid());
    }

    #[test]
    fn test_opaque_secret_is_not_a_certificate() {
        let mut store = SnapshotStore::new();
        let mut secret = make_tls_secret("infra", "cert");
        secret.type_ = Some("Opaque".to_string());
        store.apply(Event::Upsert(secret.into_resource()));

        let node = build(&store, &https_gateway(None));
        assert_eq!(
            node.listener("https").unwrap().validity.reason(),
            Some(Reason::InvalidCertificateRef)
        );
    }

    #[test]
    fn test_unsupported_protocol() {
        let gateway = make_gateway("infra", "edge", &[("tcp", "TCP", 5432, None)]);
        let node = build(&SnapshotStore::new(), &gateway);
        assert_eq!(
            node.listener("tcp").unwrap().validity.reason(),
            Some(Reason::UnsupportedProtocol)
        );
    }

    #[test]
    fn test_same_port_different_protocol_is_not_a_conflict() {
        let gateway = make_gateway(
            "infra",
            "edge",
            &[("a", "HTTP", 8080, None), ("b", "TCP", 8080, None)],
        );
        let node = build(&SnapshotStore::new(), &gateway);
        assert!(node.listener("a").unwrap().validity.is_valid());
        assert_eq!(
            node.listener("b").unwrap().validity.reason(),
            Some(Reason::UnsupportedProtocol)
        );
    }

    #[test]
    fn test_allowed_namespaces() {
        let mut gateway = make_gateway(
            "infra",
            "edge",
            &[("a", "HTTP", 80, None), ("b", "HTTP", 81, None), ("c", "HTTP", 82, None)],
        );
        gateway.spec.listeners[1].allowed_routes = serde_json::from_value(
            serde_json::json!({"namespaces": {"from": "All"}}),
        )
        .unwrap();
        gateway.spec.listeners[2].allowed_routes = serde_json::from_value(
            serde_json::json!({"namespaces": {"from": "Selector"}}),
        )
        .unwrap();

        let node = build(&SnapshotStore::new(), &gateway);
        assert_eq!(node.listener("a").unwrap().allowed_namespaces, AllowedNamespaces::Same);
        assert_eq!(node.listener("b").unwrap().allowed_namespaces, AllowedNamespaces::All);
        assert_eq!(node.listener("c").unwrap().allowed_namespaces, AllowedNamespaces::None);
    }
}
