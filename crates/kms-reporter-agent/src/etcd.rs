//! etcd snapshot source backed by `etcdctl`
//!
//! Runs `etcdctl get <prefix> --prefix -w json` over mutual TLS and decodes
//! the base64 keys and values from its JSON output.

use crate::command::{run_command, stderr_text};
use crate::traits::SnapshotSource;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use camino::Utf8PathBuf;
use kms_reporter_core::{EtcdConfig, RawRecord};
use serde::Deserialize;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Snapshot source that shells out to `etcdctl`
pub struct EtcdctlSource {
    endpoint: String,
    client_cert: Utf8PathBuf,
    client_key: Utf8PathBuf,
    ca_cert: Utf8PathBuf,
    timeout: Duration,
    /// Path to etcdctl binary (if not in PATH)
    binary_path: Option<String>,
}

impl EtcdctlSource {
    /// Create a source from etcd settings.
    ///
    /// Fails when the endpoint or any TLS file is missing.
    pub fn new(config: &EtcdConfig, timeout: Duration) -> Result<Self> {
        if config.endpoint.is_empty() {
            return Err(anyhow!("etcd endpoint is not set"));
        }

        let client_cert = config
            .client_cert
            .clone()
            .ok_or_else(|| anyhow!("etcd client certificate is not set"))?;
        let client_key = config
            .client_key
            .clone()
            .ok_or_else(|| anyhow!("etcd client key is not set"))?;
        let ca_cert = config
            .ca_cert
            .clone()
            .ok_or_else(|| anyhow!("etcd CA certificate is not set"))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            client_cert,
            client_key,
            ca_cert,
            timeout,
            binary_path: None,
        })
    }

    /// Use a specific etcdctl binary
    pub fn with_binary_path(mut self, path: impl Into<String>) -> Self {
        self.binary_path = Some(path.into());
        self
    }

    /// Get the etcdctl command
    fn etcdctl_cmd(&self) -> String {
        self.binary_path
            .clone()
            .unwrap_or_else(|| "etcdctl".to_string())
    }

    /// Check if etcdctl is installed
    pub fn check_installed(&self) -> bool {
        which::which(self.etcdctl_cmd()).is_ok()
    }

    /// Arguments for a prefix read
    fn get_args(&self, key_prefix: &str) -> Vec<String> {
        let timeout = format!("{}s", self.timeout.as_secs().max(1));
        vec![
            format!("--endpoints={}", self.endpoint),
            format!("--cert={}", self.client_cert),
            format!("--key={}", self.client_key),
            format!("--cacert={}", self.ca_cert),
            format!("--dial-timeout={}", timeout),
            format!("--command-timeout={}", timeout),
            "get".to_string(),
            key_prefix.to_string(),
            "--prefix".to_string(),
            "-w".to_string(),
            "json".to_string(),
        ]
    }
}

#[async_trait]
impl SnapshotSource for EtcdctlSource {
    fn name(&self) -> &'static str {
        "etcd"
    }

    async fn fetch(&self, key_prefix: &str) -> Result<Vec<RawRecord>> {
        let mut command = Command::new(self.etcdctl_cmd());
        command
            .env("ETCDCTL_API", "3")
            .args(self.get_args(key_prefix));

        // Leave etcdctl a moment to report its own timeout first
        let output = run_command(command, None, self.timeout + Duration::from_secs(1))
            .await
            .context("failed to get key from etcd")?;

        if !output.status.success() {
            return Err(anyhow!(
                "failed to get key from etcd: {}",
                stderr_text(&output)
            ));
        }

        let records = parse_get_response(&output.stdout)?;
        info!(
            "Fetched {} record(s) under {} from {}",
            records.len(),
            key_prefix,
            self.endpoint
        );
        Ok(records)
    }
}

/// Decode `etcdctl get -w json` output
pub fn parse_get_response(stdout: &[u8]) -> Result<Vec<RawRecord>> {
    let response: GetResponse =
        serde_json::from_slice(stdout).context("Failed to parse etcdctl output")?;
    debug!("etcd revision {}", response.header.revision);

    response
        .kvs
        .into_iter()
        .map(|kv| {
            let key = decode_field(&kv.key).context("Failed to decode etcd key")?;
            let value = decode_field(&kv.value)
                .with_context(|| format!("Failed to decode etcd value for {}", key))?;
            Ok(RawRecord::new(key, value))
        })
        .collect()
}

/// Base64 to text; stored values may be binary, so invalid UTF-8 is replaced
fn decode_field(encoded: &str) -> Result<String> {
    let bytes = STANDARD.decode(encoded)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// etcdctl JSON output types

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(default)]
    header: ResponseHeader,
    #[serde(default)]
    kvs: Vec<KeyValue>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseHeader {
    #[serde(default)]
    revision: i64,
}

#[derive(Debug, Deserialize)]
struct KeyValue {
    key: String,
    #[serde(default)]
    value: String,
}
