//! Report data persisted to the `kms-reporter` ConfigMap

use crate::types::AnalysisReport;
use std::collections::BTreeMap;

/// Written instead of a list when every classified secret is in that category
pub const ALL_SECRETS: &str = "ALL_SECRETS";

/// Data key for the encrypted secret list
pub const ENCRYPTED_KEY: &str = "ENCRYPTED";

/// Data key for the plaintext secret list
pub const UNENCRYPTED_KEY: &str = "UNENCRYPTED";

/// Data key for the latest-generation flag
pub const ENCRYPTED_BY_LATEST_SEQ_KEY: &str = "ENCRYPTED_BY_LATEST_SEQ";

/// String fields derived from an [`AnalysisReport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportData {
    pub encrypted: String,
    pub unencrypted: String,

    /// Only present when no secret is stored in plaintext
    pub encrypted_by_latest_provider: Option<bool>,
}

impl ReportData {
    /// Format a report for storage
    pub fn from_report(report: &AnalysisReport) -> Self {
        let (encrypted, unencrypted) =
            format_secret_lists(&report.encrypted_identities, &report.plaintext_identities);

        let encrypted_by_latest_provider = report
            .all_encrypted()
            .then_some(report.all_match_expected_generation);

        Self {
            encrypted,
            unencrypted,
            encrypted_by_latest_provider,
        }
    }

    /// True when neither list had any secrets
    pub fn is_empty(&self) -> bool {
        self.encrypted.is_empty() && self.unencrypted.is_empty()
    }

    /// Write the fields into ConfigMap data, keeping unrelated keys.
    ///
    /// The latest-generation key is removed when it does not apply.
    pub fn apply_to(&self, data: &mut BTreeMap<String, String>) {
        data.insert(ENCRYPTED_KEY.to_string(), self.encrypted.clone());
        data.insert(UNENCRYPTED_KEY.to_string(), self.unencrypted.clone());

        match self.encrypted_by_latest_provider {
            Some(flag) => {
                data.insert(ENCRYPTED_BY_LATEST_SEQ_KEY.to_string(), flag.to_string());
            }
            None => {
                data.remove(ENCRYPTED_BY_LATEST_SEQ_KEY);
            }
        }
    }

    /// Fresh ConfigMap data
    pub fn to_data(&self) -> BTreeMap<String, String> {
        let mut data = BTreeMap::new();
        self.apply_to(&mut data);
        data
    }
}

/// Comma-join both lists, or use [`ALL_SECRETS`] when only one list has entries
fn format_secret_lists(encrypted: &[String], unencrypted: &[String]) -> (String, String) {
    match (encrypted.is_empty(), unencrypted.is_empty()) {
        (false, false) => (encrypted.join(","), unencrypted.join(",")),
        (true, false) => (String::new(), ALL_SECRETS.to_string()),
        (false, true) => (ALL_SECRETS.to_string(), String::new()),
        (true, true) => (String::new(), String::new()),
    }
}
