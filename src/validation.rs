// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Re-validation of Gateway API resources with the rules of the Gateway API admission webhook.
//!
//! The webhook may not be installed, so a resource that reaches the controller can still be
//! invalid. A rejected resource is treated as deleted by the reconcilers.

use crate::error::ValidationError;
use crate::types::{Gateway, HTTPRoute};
use regex::Regex;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::LazyLock;

static HOSTNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*\.)?[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("hostname pattern is valid")
});

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_WEIGHT: i32 = 1_000_000;

pub type Validator<K> = Box<dyn Fn(&K) -> Result<(), ValidationError> + Send + Sync>;

pub fn validate_gateway(gateway: &Gateway) -> Result<(), ValidationError> {
    let mut names = HashSet::new();

    for (i, listener) in gateway.spec.listeners.iter().enumerate() {
        let field = format!("spec.listeners[{}]", i);

        if listener.name.is_empty() {
            return Err(ValidationError::new(format!("{}.name", field), "must not be empty"));
        }
        if !names.insert(listener.name.as_str()) {
            return Err(ValidationError::new(
                format!("{}.name", field),
                format!("duplicate listener name {:?}", listener.name),
            ));
        }
        validate_port(&format!("{}.port", field), listener.port)?;
        if let Some(hostname) = &listener.hostname {
            validate_hostname(&format!("{}.hostname", field), hostname)?;
        }
    }

    Ok(())
}

pub fn validate_http_route(route: &HTTPRoute) -> Result<(), ValidationError> {
    for (i, hostname) in route.spec.hostnames.iter().enumerate() {
        validate_hostname(&format!("spec.hostnames[{}]", i), hostname)?;
    }

    for (r, rule) in route.spec.rules.iter().enumerate() {
        for (m, matcher) in rule.matches.iter().enumerate() {
            let Some(path) = &matcher.path else { continue };
            let match_type = path.match_type.as_deref().unwrap_or("PathPrefix");
            if match_type == "RegularExpression" {
                continue;
            }
            if let Some(value) = &path.value {
                if !value.starts_with('/') {
                    return Err(ValidationError::new(
                        format!("spec.rules[{}].matches[{}].path.value", r, m),
                        "must be an absolute path",
                    ));
                }
            }
        }

        for (b, backend) in rule.backend_refs.iter().enumerate() {
            let field = format!("spec.rules[{}].backendRefs[{}]", r, b);
            if let Some(port) = backend.port {
                validate_port(&format!("{}.port", field), port)?;
            }
            if let Some(weight) = backend.weight {
                if !(0..=MAX_WEIGHT).contains(&weight) {
                    return Err(ValidationError::new(
                        format!("{}.weight", field),
                        format!("must be between 0 and {}", MAX_WEIGHT),
                    ));
                }
            }
        }
    }

    Ok(())
}

fn validate_port(field: &str, port: i32) -> Result<(), ValidationError> {
    if !(1..=65535).contains(&port) {
        return Err(ValidationError::new(field, format!("port {} out of range", port)));
    }
    Ok(())
}

fn validate_hostname(field: &str, hostname: &str) -> Result<(), ValidationError> {
    if hostname.parse::<IpAddr>().is_ok() {
        return Err(ValidationError::new(field, "must be a DNS name, not an IP address"));
    }
    if hostname.len() > MAX_HOSTNAME_LEN || !HOSTNAME.is_match(hostname) {
        return Err(ValidationError::new(
            field,
            format!("{:?} is not a valid hostname", hostname),
        ));
    }
    Ok(())
}
