//! Kubernetes access through `kubectl`
//!
//! [`KubectlClient`] reads and writes ConfigMaps. On top of it,
//! [`ConfigMapEncryptionSource`] reads the encryption configuration and
//! [`ConfigMapRecorder`] persists reports.

use crate::command::{run_command, stderr_text};
use crate::traits::{ConfigSource, ReportSink};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use camino::Utf8PathBuf;
use kms_reporter_core::{AnalysisReport, ReportData};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Thin ConfigMap client over the kubectl CLI
#[derive(Debug, Clone)]
pub struct KubectlClient {
    /// Kubeconfig to use; kubectl's default resolution applies when unset
    kubeconfig: Option<Utf8PathBuf>,
    timeout: Duration,
    /// Path to kubectl binary (if not in PATH)
    binary_path: Option<String>,
}

impl KubectlClient {
    /// Create a client using kubectl's default configuration
    pub fn new(timeout: Duration) -> Self {
        Self {
            kubeconfig: None,
            timeout,
            binary_path: None,
        }
    }

    /// Use a specific kubeconfig file
    pub fn with_kubeconfig(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Use a specific kubectl binary
    pub fn with_binary_path(mut self, path: impl Into<String>) -> Self {
        self.binary_path = Some(path.into());
        self
    }

    /// Get the kubectl command
    fn kubectl_cmd(&self) -> String {
        self.binary_path
            .clone()
            .unwrap_or_else(|| "kubectl".to_string())
    }

    /// Check if kubectl is installed
    pub fn check_installed(&self) -> bool {
        which::which(self.kubectl_cmd()).is_ok()
    }

    /// Global arguments shared by every call
    fn base_args(&self, namespace: &str) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(kubeconfig) = &self.kubeconfig {
            args.push(format!("--kubeconfig={}", kubeconfig));
        }
        args.push(format!("--request-timeout={}s", self.timeout.as_secs().max(1)));
        args.push(format!("--namespace={}", namespace));
        args
    }

    async fn kubectl(
        &self,
        namespace: &str,
        args: &[&str],
        stdin: Option<&[u8]>,
    ) -> Result<std::process::Output> {
        let mut command = Command::new(self.kubectl_cmd());
        command.args(self.base_args(namespace)).args(args);
        run_command(command, stdin, self.timeout + Duration::from_secs(1)).await
    }

    /// Fetch a ConfigMap, `None` if it does not exist
    pub async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>> {
        let output = self
            .kubectl(namespace, &["get", "configmap", name, "-o", "json"], None)
            .await?;

        if !output.status.success() {
            let stderr = stderr_text(&output);
            if is_not_found(&stderr) {
                debug!("ConfigMap {}/{} not found", namespace, name);
                return Ok(None);
            }
            return Err(anyhow!("failed to get ConfigMap {}/{}: {}", namespace, name, stderr));
        }

        let config_map = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("Failed to parse ConfigMap {}/{}", namespace, name))?;
        Ok(Some(config_map))
    }

    /// Create a new ConfigMap
    pub async fn create_config_map(&self, config_map: &ConfigMap) -> Result<()> {
        self.submit("create", config_map).await
    }

    /// Replace an existing ConfigMap
    pub async fn replace_config_map(&self, config_map: &ConfigMap) -> Result<()> {
        self.submit("replace", config_map).await
    }

    async fn submit(&self, verb: &str, config_map: &ConfigMap) -> Result<()> {
        let namespace = config_map
            .metadata
            .namespace
            .as_deref()
            .ok_or_else(|| anyhow!("ConfigMap {} has no namespace", config_map.metadata.name))?;
        let manifest = serde_json::to_vec(config_map)?;

        let output = self
            .kubectl(namespace, &[verb, "-f", "-"], Some(&manifest))
            .await?;

        if !output.status.success() {
            return Err(anyhow!(
                "failed to {} ConfigMap {}/{}: {}",
                verb,
                namespace,
                config_map.metadata.name,
                stderr_text(&output)
            ));
        }
        Ok(())
    }
}

/// kubectl reports missing objects as `Error from server (NotFound): ...`
fn is_not_found(stderr: &str) -> bool {
    stderr.contains("(NotFound)")
}

/// Minimal ConfigMap representation.
///
/// Fields this tool does not manage are kept so a replace round-trips them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMap {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_kind")]
    pub kind: String,

    pub metadata: ObjectMeta,

    #[serde(default)]
    pub data: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_kind() -> String {
    "ConfigMap".to_string()
}

impl ConfigMap {
    /// New ConfigMap with the given data
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        data: BTreeMap<String, String>,
    ) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta {
                name: name.into(),
                namespace: Some(namespace.into()),
                extra: BTreeMap::new(),
            },
            data,
            extra: BTreeMap::new(),
        }
    }
}

/// ConfigMap metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// resourceVersion, labels, annotations, ...
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Reads the encryption configuration from a ConfigMap
pub struct ConfigMapEncryptionSource {
    client: KubectlClient,
    namespace: String,
    name: String,
    key: String,
}

impl ConfigMapEncryptionSource {
    pub fn new(
        client: KubectlClient,
        namespace: impl Into<String>,
        name: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            name: name.into(),
            key: key.into(),
        }
    }
}

#[async_trait]
impl ConfigSource for ConfigMapEncryptionSource {
    fn name(&self) -> &'static str {
        "configmap"
    }

    async fn fetch_encryption_config(&self) -> Result<String> {
        let config_map = self
            .client
            .get_config_map(&self.namespace, &self.name)
            .await?
            .ok_or_else(|| {
                anyhow!(
                    "failed to get {} ConfigMap: not found in namespace {}",
                    self.name,
                    self.namespace
                )
            })?;

        config_map
            .data
            .get(&self.key)
            .cloned()
            .ok_or_else(|| anyhow!("{} not found in ConfigMap data", self.key))
    }
}

/// Writes reports into a ConfigMap, creating it on first use
pub struct ConfigMapRecorder {
    client: KubectlClient,
    namespace: String,
    name: String,
}

impl ConfigMapRecorder {
    pub fn new(client: KubectlClient, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

#[async_trait]
impl ReportSink for ConfigMapRecorder {
    fn name(&self) -> &'static str {
        "configmap"
    }

    async fn record(&self, report: &AnalysisReport) -> Result<()> {
        let data = ReportData::from_report(report);
        if data.is_empty() {
            warn!("No secrets found to record");
        }

        match self.client.get_config_map(&self.namespace, &self.name).await? {
            Some(mut config_map) => {
                data.apply_to(&mut config_map.data);
                self.client
                    .replace_config_map(&config_map)
                    .await
                    .context("failed to update ConfigMap")?;
                info!("ConfigMap {} updated successfully", self.name);
            }
            None => {
                let config_map = ConfigMap::new(&self.namespace, &self.name, data.to_data());
                self.client
                    .create_config_map(&config_map)
                    .await
                    .context("failed to create ConfigMap")?;
                info!("ConfigMap {} created successfully", self.name);
            }
        }

        Ok(())
    }
}
