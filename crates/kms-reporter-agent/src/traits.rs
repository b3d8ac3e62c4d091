//! Collaborator traits
//!
//! The analysis engine is pure; everything that talks to etcd or the
//! Kubernetes API sits behind one of these traits so the read operation can
//! be driven by real clients or by test doubles.

use anyhow::Result;
use async_trait::async_trait;
use kms_reporter_core::{AnalysisReport, RawRecord};

/// Source of the key/value snapshot to analyze
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Source name for log and error messages
    fn name(&self) -> &'static str;

    /// Fetch every record under `key_prefix`, in store order
    async fn fetch(&self, key_prefix: &str) -> Result<Vec<RawRecord>>;
}

/// Source of the API server's encryption configuration document
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Source name for log and error messages
    fn name(&self) -> &'static str;

    /// Fetch the raw YAML document
    async fn fetch_encryption_config(&self) -> Result<String>;
}

/// Destination for finished reports
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Sink name for log and error messages
    fn name(&self) -> &'static str;

    /// Persist one report, replacing the previous one
    async fn record(&self, report: &AnalysisReport) -> Result<()>;
}
