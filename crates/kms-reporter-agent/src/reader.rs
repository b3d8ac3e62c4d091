//! One analysis run: snapshot, resolve, analyze, record

use crate::traits::{ConfigSource, ReportSink, SnapshotSource};
use anyhow::{Context, Result};
use kms_reporter_core::{analyze, resolve_from_yaml, AnalysisReport, ExpectedGeneration};
use tracing::{debug, info, warn};

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The snapshot was empty; nothing was resolved or recorded
    NoSecrets,
    /// The snapshot was analyzed
    Analyzed {
        expected: ExpectedGeneration,
        report: AnalysisReport,
        recorded: bool,
    },
}

/// Wires the collaborators to the analysis engine
pub struct ReadOperation {
    snapshot: Box<dyn SnapshotSource>,
    config: Box<dyn ConfigSource>,
    sink: Option<Box<dyn ReportSink>>,
    provider_prefix: String,
    key_prefix: String,
}

impl ReadOperation {
    /// Create an operation that analyzes without recording
    pub fn new(
        snapshot: Box<dyn SnapshotSource>,
        config: Box<dyn ConfigSource>,
        provider_prefix: impl Into<String>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            snapshot,
            config,
            sink: None,
            provider_prefix: provider_prefix.into(),
            key_prefix: key_prefix.into(),
        }
    }

    /// Record each report to `sink`
    pub fn with_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run once.
    ///
    /// Fails without recording anything if the snapshot or the configuration
    /// cannot be fetched, or the configuration cannot be parsed; the last
    /// recorded report is then left in place.
    pub async fn read(&self) -> Result<ReadOutcome> {
        let records = self
            .snapshot
            .fetch(&self.key_prefix)
            .await
            .with_context(|| format!("failed to read snapshot from {}", self.snapshot.name()))?;

        if records.is_empty() {
            warn!("No secrets found in {}", self.snapshot.name());
            return Ok(ReadOutcome::NoSecrets);
        }

        let expected = self
            .expected_generation()
            .await
            .context("failed to get latest provider generation")?;
        debug!("Expected provider generation: {}", expected);

        let report = analyze(&records, expected, &self.provider_prefix);
        for skipped in &report.skipped {
            warn!("Failed to parse secret {}: {}", skipped.key, skipped.error);
        }
        info!(
            "Analyzed {} secret(s): {} encrypted, {} unencrypted, {} skipped, all at expected generation: {}",
            records.len(),
            report.encrypted_identities.len(),
            report.plaintext_identities.len(),
            report.skipped.len(),
            report.all_match_expected_generation
        );

        let recorded = match &self.sink {
            Some(sink) => {
                sink.record(&report).await.with_context(|| {
                    format!(
                        "failed to store secret encryption status in {}",
                        sink.name()
                    )
                })?;
                true
            }
            None => false,
        };

        Ok(ReadOutcome::Analyzed {
            expected,
            report,
            recorded,
        })
    }

    /// Fetch and resolve the encryption configuration
    async fn expected_generation(&self) -> Result<ExpectedGeneration> {
        let document = self.config.fetch_encryption_config().await?;
        Ok(resolve_from_yaml(&document, &self.provider_prefix)?)
    }
}
