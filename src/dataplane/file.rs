// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::{ConfigApplier, DataplaneConfig};
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Writes the configuration as JSON to a file watched by the proxy.
///
/// The file is replaced atomically so the proxy never reads a partial configuration.
pub struct FileApplier {
    path: PathBuf,
}

impl FileApplier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl ConfigApplier for FileApplier {
    #[instrument(skip(self, config), fields(path = %self.path.display(), servers = config.servers.len()))]
    async fn apply(&self, config: &DataplaneConfig) -> Result<()> {
        let body = serde_json::to_vec_pretty(config)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &body).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        debug!(bytes = body.len(), "Wrote dataplane configuration");
        Ok(())
    }
}
