// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRD availability checking utilities

use crate::constants::crd::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS};
use crate::constants::gateway_api::{GATEWAY_KIND, GROUP, HTTP_ROUTE_KIND, REFERENCE_GRANT_KIND};
use crate::error::Result;
use kube::{discovery::Discovery, Client};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const REQUIRED_KINDS: [&str; 3] = [GATEWAY_KIND, HTTP_ROUTE_KIND, REFERENCE_GRANT_KIND];

/// Wait for the Gateway API CRDs to become available in the cluster.
/// This uses exponential backoff starting at POLL_INTERVAL_SECS seconds.
/// Returns `Ok(false)` when cancelled before the CRDs showed up.
pub async fn wait_for_gateway_api_crds(client: &Client, cancel: &CancellationToken) -> Result<bool> {
    let mut interval = POLL_INTERVAL_SECS;

    loop {
        match missing_gateway_api_kinds(client).await {
            Ok(missing) if missing.is_empty() => {
                info!("Gateway API CRDs ({}) are available", GROUP);
                return Ok(true);
            }
            Ok(missing) => {
                info!(
                    "Gateway API CRDs not yet available (missing: {}), waiting {} seconds...",
                    missing.join(", "),
                    interval
                );
            }
            Err(e) => {
                warn!(
                    "Error checking for Gateway API CRDs: {}, retrying in {} seconds...",
                    e, interval
                );
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return Ok(false),
            _ = sleep(Duration::from_secs(interval)) => {}
        }

        // Exponential backoff with max cap
        interval = (interval * 2).min(POLL_MAX_INTERVAL_SECS);
    }
}

/// Discover the Gateway API group and report which required kinds are not served yet.
async fn missing_gateway_api_kinds(client: &Client) -> Result<Vec<&'static str>> {
    let discovery = Discovery::new(client.clone()).filter(&[GROUP]).run().await?;

    let served: Vec<String> = discovery
        .groups()
        .filter(|group| group.name() == GROUP)
        .flat_map(|group| group.recommended_resources())
        .map(|(ar, _)| ar.kind)
        .collect();

    Ok(missing_kinds(&served))
}

fn missing_kinds(served: &[String]) -> Vec<&'static str> {
    REQUIRED_KINDS
        .iter()
        .copied()
        .filter(|kind| !served.iter().any(|s| s == kind))
        .collect()
}
