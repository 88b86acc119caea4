// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Whether a listener hostname and a route's hostnames have a non-empty intersection.
/// A missing listener hostname or an empty route hostname list matches everything.
pub fn hostnames_intersect(listener: Option<&str>, route: &[String]) -> bool {
    let Some(listener) = listener else {
        return true;
    };
    route.is_empty() || route.iter().any(|h| hostname_matches(listener, h))
}

/// A leading `*.` matches one or more labels.
fn hostname_matches(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (a.strip_prefix("*."), b.strip_prefix("*.")) {
        (Some(sa), Some(sb)) => is_subdomain(sa, sb) || is_subdomain(sb, sa),
        (Some(sa), None) => is_subdomain(b, sa),
        (None, Some(sb)) => is_subdomain(a, sb),
        (None, None) => false,
    }
}

fn is_subdomain(host: &str, domain: &str) -> bool {
    host.len() > domain.len()
        && host.ends_with(domain)
        && host.as_bytes()[host.len() - domain.len() - 1] == b'.'
}
