// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::DEFAULT_CONTROLLER_NAME;
use crate::events::NamespacedName;
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Controller configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// GatewayClass whose Gateways this controller processes
    pub gateway_class_name: String,
    /// When set, only this Gateway is processed
    pub gateway: Option<NamespacedName>,
    /// Restrict all watches to one namespace
    pub watch_namespace: Option<String>,
    pub controller_name: String,
    pub dataplane_config_path: PathBuf,
    pub event_channel_capacity: usize,
    /// Extra time the event loop keeps draining after the first event of a batch
    pub batch_window: Duration,
    pub max_batch_size: usize,
    pub apply_timeout: Duration,
    pub resync_interval: Duration,
    pub update_status: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&env::vars().collect())
    }

    fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let gateway_class_name = vars
            .get("GATEWAY_CLASS_NAME")
            .cloned()
            .context("GATEWAY_CLASS_NAME environment variable not set")?;

        let gateway = vars
            .get("GATEWAY")
            .map(|v| parse_namespaced_name(v))
            .transpose()
            .context("GATEWAY must have the form namespace/name")?;

        Ok(Config {
            gateway_class_name,
            gateway,
            watch_namespace: vars.get("WATCH_NAMESPACE").filter(|v| !v.is_empty()).cloned(),
            controller_name: vars
                .get("CONTROLLER_NAME")
                .cloned()
                .unwrap_or_else(|| DEFAULT_CONTROLLER_NAME.to_string()),
            dataplane_config_path: vars
                .get("DATAPLANE_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/etc/waypost/dataplane.json")),
            event_channel_capacity: parse_or(vars, "EVENT_CHANNEL_CAPACITY", 256)?,
            batch_window: Duration::from_millis(parse_or(vars, "BATCH_WINDOW_MS", 100)?),
            max_batch_size: parse_or(vars, "MAX_BATCH_SIZE", 1024)?,
            apply_timeout: Duration::from_secs(parse_or(vars, "APPLY_TIMEOUT_SECS", 30)?),
            resync_interval: Duration::from_secs(parse_or(vars, "RESYNC_INTERVAL_SECS", 60)?),
            update_status: parse_or(vars, "UPDATE_STATUS", true)?,
        })
    }
}

fn parse_or<T>(vars: &HashMap<String, String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match vars.get(key) {
        Some(v) => v
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, v)),
        None => Ok(default),
    }
}

fn parse_namespaced_name(value: &str) -> Result<NamespacedName> {
    match value.split_once('/') {
        Some((ns, name)) if !ns.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(NamespacedName::new(ns, name))
        }
        _ => Err(anyhow!("invalid namespaced name {:?}", value)),
    }
}
