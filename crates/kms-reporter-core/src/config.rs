//! Reporter settings
//!
//! Settings can be loaded from a YAML file and then overridden field by field
//! (the CLI does this with flags and `KMS_REPORTER_*` environment variables).
//!
//! ```yaml
//! namespace: kube-system
//! kmsProviderName: kmsprovider
//! runIntervalSecs: 300
//! etcd:
//!   endpoint: https://127.0.0.1:2379
//!   clientCert: /etc/kubernetes/pki/etcd/client.crt
//!   clientKey: /etc/kubernetes/pki/etcd/client.key
//!   caCert: /etc/kubernetes/pki/etcd/ca.crt
//! ```

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

/// Default KMS provider name prefix
pub const DEFAULT_PROVIDER_PREFIX: &str = "kmsprovider";

/// etcd key prefix holding Secret objects
pub const DEFAULT_SECRET_KEY_PREFIX: &str = "/registry/secrets";

/// Default interval between analysis runs
pub const DEFAULT_RUN_INTERVAL_SECS: u64 = 300;

/// Default timeout for a single etcd or Kubernetes call
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 5;

/// ConfigMap holding the API server's encryption configuration
pub const DEFAULT_ENCRYPTION_CONFIG_MAP: &str = "encryption-provider-config";

/// Data key of the encryption configuration inside its ConfigMap
pub const DEFAULT_ENCRYPTION_CONFIG_KEY: &str = "encryption-provider-config.yaml";

/// ConfigMap the report is written to
pub const DEFAULT_REPORT_CONFIG_MAP: &str = "kms-reporter";

/// RFC 1123 label, which is what Kubernetes accepts for namespaces
static NAMESPACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]{0,61}[a-z0-9])?$").expect("namespace pattern is valid")
});

/// Complete reporter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReporterConfig {
    /// etcd connection settings
    #[serde(default)]
    pub etcd: EtcdConfig,

    /// Namespace of both the encryption configuration and the report ConfigMaps
    #[serde(default)]
    pub namespace: String,

    /// Kubeconfig used for writing the report; the default context is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<Utf8PathBuf>,

    /// KMS provider name prefix, e.g. `kmsprovider` for `kmsprovider3`
    #[serde(default = "default_provider_prefix")]
    pub kms_provider_name: String,

    /// Seconds between analysis runs
    #[serde(default = "default_run_interval_secs")]
    pub run_interval_secs: u64,

    /// Timeout in seconds for each etcd or Kubernetes call
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// etcd key prefix to scan
    #[serde(default = "default_secret_key_prefix")]
    pub secret_key_prefix: String,

    /// ConfigMap names and keys
    #[serde(default)]
    pub config_maps: ConfigMapNames,
}

fn default_provider_prefix() -> String {
    DEFAULT_PROVIDER_PREFIX.to_string()
}

fn default_run_interval_secs() -> u64 {
    DEFAULT_RUN_INTERVAL_SECS
}

fn default_command_timeout_secs() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

fn default_secret_key_prefix() -> String {
    DEFAULT_SECRET_KEY_PREFIX.to_string()
}

impl ReporterConfig {
    /// Create settings for a namespace with defaults everywhere else
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            etcd: EtcdConfig::default(),
            namespace: namespace.into(),
            kubeconfig: None,
            kms_provider_name: default_provider_prefix(),
            run_interval_secs: DEFAULT_RUN_INTERVAL_SECS,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            secret_key_prefix: default_secret_key_prefix(),
            config_maps: ConfigMapNames::default(),
        }
    }

    /// Load settings from a YAML file
    pub fn load(path: &Utf8Path) -> Result<Self> {
        debug!("Loading settings from {}", path);
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::settings_not_found(path.as_str())
            } else {
                Error::Io(e)
            }
        })?;

        serde_yaml_ng::from_str(&content).map_err(|source| Error::SettingsParse {
            path: path.to_string(),
            source,
        })
    }

    /// Set the etcd settings
    pub fn with_etcd(mut self, etcd: EtcdConfig) -> Self {
        self.etcd = etcd;
        self
    }

    /// Set the recorder kubeconfig
    pub fn with_kubeconfig(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Set the KMS provider name prefix
    pub fn with_kms_provider_name(mut self, prefix: impl Into<String>) -> Self {
        self.kms_provider_name = prefix.into();
        self
    }

    /// Set the run interval
    pub fn with_run_interval(mut self, interval: Duration) -> Self {
        self.run_interval_secs = interval.as_secs();
        self
    }

    /// Set the per-call timeout
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout_secs = timeout.as_secs();
        self
    }

    /// Interval between analysis runs
    pub fn run_interval(&self) -> Duration {
        Duration::from_secs(self.run_interval_secs)
    }

    /// Timeout for each etcd or Kubernetes call
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Check settings needed by every command that talks to the cluster
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.namespace.is_empty() {
            errors.push("namespace is required".to_string());
        } else if !NAMESPACE_RE.is_match(&self.namespace) {
            errors.push(format!("namespace '{}' is not a valid name", self.namespace));
        }

        if self.kms_provider_name.is_empty() {
            errors.push("kmsProviderName must not be empty".to_string());
        }

        if self.run_interval_secs == 0 {
            errors.push("runIntervalSecs must be greater than zero".to_string());
        }

        if self.command_timeout_secs == 0 {
            errors.push("commandTimeoutSecs must be greater than zero".to_string());
        }

        if !self.secret_key_prefix.starts_with('/') {
            errors.push(format!(
                "secretKeyPrefix '{}' must start with '/'",
                self.secret_key_prefix
            ));
        }

        if !errors.is_empty() {
            return Err(Error::invalid_config(errors.join("; ")));
        }

        Ok(())
    }

    /// Check the etcd connection settings
    pub fn validate_etcd(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.etcd.endpoint.is_empty() {
            missing.push("etcd endpoint");
        }
        if self.etcd.client_cert.is_none() {
            missing.push("etcd client certificate");
        }
        if self.etcd.client_key.is_none() {
            missing.push("etcd client key");
        }
        if self.etcd.ca_cert.is_none() {
            missing.push("etcd CA certificate");
        }

        if !missing.is_empty() {
            return Err(Error::invalid_config(format!(
                "missing {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self::new("")
    }
}

/// etcd endpoint and mutual TLS material
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtcdConfig {
    /// e.g. `https://127.0.0.1:2379`
    #[serde(default)]
    pub endpoint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert: Option<Utf8PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<Utf8PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<Utf8PathBuf>,
}

impl EtcdConfig {
    /// Create etcd settings for an endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Set the client certificate and key
    pub fn with_client_cert(
        mut self,
        cert: impl Into<Utf8PathBuf>,
        key: impl Into<Utf8PathBuf>,
    ) -> Self {
        self.client_cert = Some(cert.into());
        self.client_key = Some(key.into());
        self
    }

    /// Set the CA certificate
    pub fn with_ca_cert(mut self, ca: impl Into<Utf8PathBuf>) -> Self {
        self.ca_cert = Some(ca.into());
        self
    }
}

/// Names of the ConfigMaps the reporter reads and writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapNames {
    #[serde(default = "default_encryption_config_map")]
    pub encryption_config: String,

    #[serde(default = "default_encryption_config_key")]
    pub encryption_config_key: String,

    #[serde(default = "default_report_config_map")]
    pub report: String,
}

fn default_encryption_config_map() -> String {
    DEFAULT_ENCRYPTION_CONFIG_MAP.to_string()
}

fn default_encryption_config_key() -> String {
    DEFAULT_ENCRYPTION_CONFIG_KEY.to_string()
}

fn default_report_config_map() -> String {
    DEFAULT_REPORT_CONFIG_MAP.to_string()
}

impl Default for ConfigMapNames {
    fn default() -> Self {
        Self {
            encryption_config: default_encryption_config_map(),
            encryption_config_key: default_encryption_config_key(),
            report: default_report_config_map(),
        }
    }
}

/// Parse `300`, `30s`, `5m` or `1h` into a duration
pub fn parse_duration(value: &str) -> Result<Duration> {
    let trimmed = value.trim();
    let (digits, multiplier) = match trimmed.char_indices().last() {
        Some((idx, 's')) => (&trimmed[..idx], 1),
        Some((idx, 'm')) => (&trimmed[..idx], 60),
        Some((idx, 'h')) => (&trimmed[..idx], 3600),
        _ => (trimmed, 1),
    };

    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .map(Duration::from_secs)
        .ok_or_else(|| Error::invalid_duration(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ReporterConfig {
        ReporterConfig::new("kube-system").with_etcd(
            EtcdConfig::new("https://127.0.0.1:2379")
                .with_client_cert("/pki/client.crt", "/pki/client.key")
                .with_ca_cert("/pki/ca.crt"),
        )
    }

    #[test]
    fn test_defaults() {
        let config = ReporterConfig::default();
        assert_eq!(config.kms_provider_name, DEFAULT_PROVIDER_PREFIX);
        assert_eq!(config.run_interval(), Duration::from_secs(300));
        assert_eq!(config.command_timeout(), Duration::from_secs(5));
        assert_eq!(config.secret_key_prefix, "/registry/secrets");
        assert_eq!(config.config_maps.report, "kms-reporter");
        assert_eq!(
            config.config_maps.encryption_config_key,
            "encryption-provider-config.yaml"
        );
    }

    #[test]
    fn test_builder() {
        let config = ReporterConfig::new("ns")
            .with_kms_provider_name("azurekms")
            .with_run_interval(Duration::from_secs(60))
            .with_kubeconfig("/home/u/.kube/config");
        assert_eq!(config.kms_provider_name, "azurekms");
        assert_eq!(config.run_interval_secs, 60);
        assert_eq!(
            config.kubeconfig.as_deref(),
            Some(Utf8Path::new("/home/u/.kube/config"))
        );
    }

    #[test]
    fn test_validate() {
        assert!(valid_config().validate().is_ok());
        assert!(valid_config().validate_etcd().is_ok());

        let err = ReporterConfig::new("").validate().unwrap_err();
        assert!(err.to_string().contains("namespace is required"));

        let err = ReporterConfig::new("Not_A_Namespace").validate().unwrap_err();
        assert!(err.to_string().contains("not a valid name"));

        let mut config = valid_config();
        config.run_interval_secs = 0;
        config.kms_provider_name.clear();
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("runIntervalSecs"));
        assert!(message.contains("kmsProviderName"));
    }

    #[test]
    fn test_validate_etcd_lists_missing_fields() {
        let config = ReporterConfig::new("default").with_etcd(EtcdConfig::new("https://e:2379"));
        let message = config.validate_etcd().unwrap_err().to_string();
        assert!(message.contains("client certificate"));
        assert!(message.contains("CA certificate"));
        assert!(!message.contains("endpoint"));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("300").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("-5s").is_err());
    }
}
