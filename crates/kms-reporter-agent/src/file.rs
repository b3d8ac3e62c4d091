//! Encryption configuration read from a local file
//!
//! Useful on a control-plane node, where the API server's
//! `--encryption-provider-config` file can be read directly.

use crate::traits::ConfigSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};

/// Reads the encryption configuration from disk on every fetch
pub struct FileConfigSource {
    path: Utf8PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch_encryption_config(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read encryption configuration {}", self.path))
    }
}
