//! CLI argument parsing with clap

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use kms_reporter_core::{parse_duration, ReporterConfig};
use std::time::Duration;

/// kms-reporter - KMS encryption status of Kubernetes Secrets
#[derive(Parser, Debug)]
#[command(name = "kms-reporter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a kms-reporter settings file
    #[arg(short, long, global = true, env = "KMS_REPORTER_CONFIG")]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze now and then on every interval, recording each report
    Run(RunArgs),

    /// Analyze once and print the report
    Scan(ScanArgs),

    /// Print the expected provider generation for an encryption configuration file
    Resolve(ResolveArgs),

    /// Classify a single etcd key and value
    Classify(ClassifyArgs),
}

/// Cluster connection flags shared by `run` and `scan`
#[derive(Args, Debug, Default, Clone)]
pub struct ClusterArgs {
    /// etcd endpoint, e.g. https://127.0.0.1:2379
    #[arg(long, env = "KMS_REPORTER_ETCD_ENDPOINT")]
    pub etcd_endpoint: Option<String>,

    /// etcd client certificate
    #[arg(long, env = "KMS_REPORTER_ETCD_CLIENT_CRT")]
    pub etcd_client_crt: Option<Utf8PathBuf>,

    /// etcd client key
    #[arg(long, env = "KMS_REPORTER_ETCD_CLIENT_KEY")]
    pub etcd_client_key: Option<Utf8PathBuf>,

    /// etcd client CA certificate
    #[arg(long, env = "KMS_REPORTER_ETCD_CLIENT_CA_CRT")]
    pub etcd_client_ca_crt: Option<Utf8PathBuf>,

    /// Namespace of the encryption configuration and report ConfigMaps
    #[arg(short, long, env = "KMS_REPORTER_NAMESPACE")]
    pub namespace: Option<String>,

    /// Kubeconfig used for recording the report
    #[arg(long, env = "KMS_REPORTER_KUBECONFIG")]
    pub kubeconfig: Option<Utf8PathBuf>,

    /// Timeout for each etcd or Kubernetes call (e.g. 5, 10s)
    #[arg(long, env = "KMS_REPORTER_COMMAND_TIMEOUT", value_parser = duration_arg)]
    pub command_timeout: Option<Duration>,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

impl ClusterArgs {
    /// Apply the flags that were given on top of `config`
    pub fn apply(&self, mut config: ReporterConfig) -> ReporterConfig {
        if let Some(endpoint) = &self.etcd_endpoint {
            config.etcd.endpoint = endpoint.clone();
        }
        if let Some(cert) = &self.etcd_client_crt {
            config.etcd.client_cert = Some(cert.clone());
        }
        if let Some(key) = &self.etcd_client_key {
            config.etcd.client_key = Some(key.clone());
        }
        if let Some(ca) = &self.etcd_client_ca_crt {
            config.etcd.ca_cert = Some(ca.clone());
        }
        if let Some(namespace) = &self.namespace {
            config.namespace = namespace.clone();
        }
        if let Some(kubeconfig) = &self.kubeconfig {
            config = config.with_kubeconfig(kubeconfig.clone());
        }
        if let Some(timeout) = self.command_timeout {
            config = config.with_command_timeout(timeout);
        }
        self.provider.apply(config)
    }
}

/// KMS provider naming flags
#[derive(Args, Debug, Default, Clone)]
pub struct ProviderArgs {
    /// Prefix of the KMS provider names in the encryption configuration
    #[arg(long, env = "KMS_REPORTER_KMS_PROVIDER_NAME")]
    pub kms_provider_name: Option<String>,
}

impl ProviderArgs {
    pub fn apply(&self, config: ReporterConfig) -> ReporterConfig {
        match &self.kms_provider_name {
            Some(prefix) => config.with_kms_provider_name(prefix.clone()),
            None => config,
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub cluster: ClusterArgs,

    /// Interval between runs (e.g. 300, 30s, 5m, 1h)
    #[arg(long, env = "KMS_REPORTER_RUN_INTERVAL", value_parser = duration_arg)]
    pub run_interval: Option<Duration>,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub cluster: ClusterArgs,

    /// Output format: human, json, yaml
    #[arg(short, long, default_value = "human")]
    pub format: String,

    /// Also write the report to its ConfigMap
    #[arg(long)]
    pub record: bool,

    /// Read the encryption configuration from this file instead of its ConfigMap
    #[arg(long)]
    pub encryption_config: Option<Utf8PathBuf>,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Encryption configuration file
    #[arg(long)]
    pub file: Utf8PathBuf,

    #[command(flatten)]
    pub provider: ProviderArgs,

    /// Output format: human, json, yaml
    #[arg(short, long, default_value = "human")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// etcd key, e.g. /registry/secrets/default/my-secret
    pub key: String,

    /// Stored value, e.g. k8s:enc:kms:v2:kmsprovider1:...
    pub value: String,

    #[command(flatten)]
    pub provider: ProviderArgs,

    /// Output format: human, json, yaml
    #[arg(short, long, default_value = "human")]
    pub format: String,
}

/// Load settings from `--config`, or start from defaults
pub fn load_config(path: Option<&Utf8Path>) -> anyhow::Result<ReporterConfig> {
    match path {
        Some(path) => Ok(ReporterConfig::load(path)?),
        None => Ok(ReporterConfig::default()),
    }
}

fn duration_arg(value: &str) -> Result<Duration, String> {
    parse_duration(value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use kms_reporter_core::EtcdConfig;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::try_parse_from([
            "kms-reporter",
            "run",
            "--etcd-endpoint",
            "https://10.0.0.1:2379",
            "--etcd-client-crt",
            "/pki/client.crt",
            "--etcd-client-key",
            "/pki/client.key",
            "--etcd-client-ca-crt",
            "/pki/ca.crt",
            "--namespace",
            "kube-system",
            "--run-interval",
            "10m",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.run_interval, Some(Duration::from_secs(600)));

        let config = args.cluster.apply(ReporterConfig::default());
        assert_eq!(config.etcd.endpoint, "https://10.0.0.1:2379");
        assert_eq!(config.etcd.ca_cert.as_deref(), Some(Utf8Path::new("/pki/ca.crt")));
        assert_eq!(config.namespace, "kube-system");
        assert!(config.validate().is_ok());
        assert!(config.validate_etcd().is_ok());
    }

    #[test]
    fn test_flags_override_settings_file() {
        let file = ReporterConfig::new("default")
            .with_kms_provider_name("vault")
            .with_etcd(EtcdConfig::new("https://etcd:2379"));

        let args = ClusterArgs {
            namespace: Some("kube-system".to_string()),
            ..ClusterArgs::default()
        };
        let config = args.apply(file);

        assert_eq!(config.namespace, "kube-system");
        assert_eq!(config.kms_provider_name, "vault");
        assert_eq!(config.etcd.endpoint, "https://etcd:2379");
    }

    #[test]
    fn test_invalid_interval() {
        let result = Cli::try_parse_from(["kms-reporter", "run", "--run-interval", "soon"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "kms-reporter",
            "classify",
            "/registry/secrets/a/b",
            "plain",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }
}
