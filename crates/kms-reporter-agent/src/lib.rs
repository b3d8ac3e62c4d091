//! I/O side of kms-reporter
//!
//! This crate connects the pure analysis engine in `kms-reporter-core` to a
//! live cluster:
//!
//! - **etcd**: `etcdctl` over mutual TLS for the `/registry/secrets` snapshot
//! - **Kubernetes**: `kubectl` for the encryption configuration and report ConfigMaps
//! - **Local files**: encryption configuration read from disk
//! - **Scheduling**: periodic runs with graceful shutdown on SIGINT/SIGTERM
//!
//! # Architecture
//!
//! ```text
//! ReadOperation
//! ├── SnapshotSource  (EtcdctlSource)
//! ├── ConfigSource    (ConfigMapEncryptionSource, FileConfigSource)
//! └── ReportSink      (ConfigMapRecorder)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use kms_reporter_agent::{build_read_operation, run_periodically, shutdown_signal};
//! use kms_reporter_core::ReporterConfig;
//! use camino::Utf8Path;
//!
//! let config = ReporterConfig::load(Utf8Path::new("kms-reporter.yaml"))?;
//! let reader = build_read_operation(&config, None, true)?;
//! run_periodically(&reader, config.run_interval(), shutdown_signal()).await;
//! ```

mod command;
pub mod etcd;
pub mod file;
pub mod kubectl;
pub mod reader;
pub mod scheduler;
pub mod traits;

pub use etcd::EtcdctlSource;
pub use file::FileConfigSource;
pub use kubectl::{ConfigMap, ConfigMapEncryptionSource, ConfigMapRecorder, KubectlClient};
pub use reader::{ReadOperation, ReadOutcome};
pub use scheduler::{run_periodically, shutdown_signal};
pub use traits::{ConfigSource, ReportSink, SnapshotSource};

use anyhow::Result;
use camino::Utf8Path;
use kms_reporter_core::ReporterConfig;

/// Build a read operation against the live cluster.
///
/// The encryption configuration comes from `encryption_config_file` when
/// given, otherwise from its ConfigMap through the default kubectl context.
/// With `record`, reports are written through the recorder kubeconfig when
/// one is configured.
pub fn build_read_operation(
    config: &ReporterConfig,
    encryption_config_file: Option<&Utf8Path>,
    record: bool,
) -> Result<ReadOperation> {
    let timeout = config.command_timeout();
    let snapshot = EtcdctlSource::new(&config.etcd, timeout)?;
    if !snapshot.check_installed() {
        tracing::warn!("etcdctl not found in PATH; every run will fail until it is installed");
    }

    let config_source: Box<dyn ConfigSource> = match encryption_config_file {
        Some(path) => Box::new(FileConfigSource::new(path)),
        None => Box::new(ConfigMapEncryptionSource::new(
            KubectlClient::new(timeout),
            &config.namespace,
            &config.config_maps.encryption_config,
            &config.config_maps.encryption_config_key,
        )),
    };

    let reader = ReadOperation::new(
        Box::new(snapshot),
        config_source,
        &config.kms_provider_name,
        &config.secret_key_prefix,
    );

    if !record {
        return Ok(reader);
    }

    let mut recorder_client = KubectlClient::new(timeout);
    if let Some(kubeconfig) = &config.kubeconfig {
        tracing::info!("Using kubeconfig file for recorder: {}", kubeconfig);
        recorder_client = recorder_client.with_kubeconfig(kubeconfig.clone());
    }

    Ok(reader.with_sink(Box::new(ConfigMapRecorder::new(
        recorder_client,
        &config.namespace,
        &config.config_maps.report,
    ))))
}
