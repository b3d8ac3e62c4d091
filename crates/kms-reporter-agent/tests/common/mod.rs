//! Test doubles for the collaborator traits
//!
//! Each double shares its counters through `Arc` so a test can hand the
//! double to a `ReadOperation` and still inspect it afterwards.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use kms_reporter_agent::{ConfigSource, ReportSink, SnapshotSource};
use kms_reporter_core::{AnalysisReport, RawRecord};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const PREFIX: &str = "kmsprovider";
pub const KEY_PREFIX: &str = "/registry/secrets";

// ─── Fixtures ──────────────────────────────────────────────────────────────

pub fn encrypted(namespace: &str, name: &str, generation: u64) -> RawRecord {
    RawRecord::new(
        format!("{}/{}/{}", KEY_PREFIX, namespace, name),
        format!("k8s:enc:kms:v2:{}{}:c2VjcmV0", PREFIX, generation),
    )
}

pub fn plaintext(namespace: &str, name: &str) -> RawRecord {
    RawRecord::new(
        format!("{}/{}/{}", KEY_PREFIX, namespace, name),
        "k8s\u{0}\n\u{c}\n\u{2}v1\u{12}\u{6}Secret",
    )
}

/// Encryption configuration whose first secrets provider is `kmsprovider<generation>`
pub fn kms_config(generation: u64) -> String {
    format!(
        "apiVersion: apiserver.config.k8s.io/v1\n\
         kind: EncryptionConfiguration\n\
         resources:\n  - resources:\n      - secrets\n    providers:\n      \
         - kms:\n          apiVersion: v2\n          name: {}{}\n          endpoint: unix:///opt/kms.socket\n      \
         - identity: {{}}\n",
        PREFIX, generation
    )
}

// ─── Snapshot ──────────────────────────────────────────────────────────────

/// Returns the same records on every fetch
pub struct StaticSnapshot {
    records: Vec<RawRecord>,
    fetches: Arc<AtomicUsize>,
}

impl StaticSnapshot {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            records,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetches)
    }
}

#[async_trait]
impl SnapshotSource for StaticSnapshot {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(&self, key_prefix: &str) -> Result<Vec<RawRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .records
            .iter()
            .filter(|record| record.key.starts_with(key_prefix))
            .cloned()
            .collect())
    }
}

/// Always fails to fetch
pub struct FailingSnapshot;

#[async_trait]
impl SnapshotSource for FailingSnapshot {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn fetch(&self, _key_prefix: &str) -> Result<Vec<RawRecord>> {
        Err(anyhow!("connection refused"))
    }
}

// ─── Encryption configuration ──────────────────────────────────────────────

/// Serves a fixed document, or fails when none is set
pub struct StaticConfig {
    document: Option<String>,
    fetches: Arc<AtomicUsize>,
}

impl StaticConfig {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: Some(document.into()),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            document: None,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetches)
    }
}

#[async_trait]
impl ConfigSource for StaticConfig {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch_encryption_config(&self) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.document
            .clone()
            .ok_or_else(|| anyhow!("encryption-provider-config not found"))
    }
}

// ─── Report sink ───────────────────────────────────────────────────────────

/// Keeps every recorded report in memory
#[derive(Default)]
pub struct MemorySink {
    reports: Arc<Mutex<Vec<AnalysisReport>>>,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            reports: Arc::default(),
            fail: true,
        }
    }

    pub fn reports(&self) -> Arc<Mutex<Vec<AnalysisReport>>> {
        Arc::clone(&self.reports)
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn record(&self, report: &AnalysisReport) -> Result<()> {
        if self.fail {
            return Err(anyhow!("configmaps is forbidden"));
        }
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}
