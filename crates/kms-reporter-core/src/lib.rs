//! # kms-reporter-core
//!
//! Encryption-status analysis engine for Kubernetes secrets stored in etcd:
//! - Record classification (KMS envelope detection, `<namespace>/<name>`, provider generation)
//! - Expected provider generation from the API server's `EncryptionConfiguration`
//! - Batch analysis into an [`AnalysisReport`]
//! - ConfigMap report formatting
//! - Reporter settings
//!
//! Everything here is pure and synchronous; I/O lives in `kms-reporter-agent`.
//!
//! # Example
//!
//! ```
//! use kms_reporter_core::{analyze, resolve_from_yaml, RawRecord};
//!
//! let config = "resources:\n  - resources: [secrets]\n    providers:\n      - kms:\n          name: kmsprovider1\n";
//! let expected = resolve_from_yaml(config, "kmsprovider").unwrap();
//!
//! let records = vec![RawRecord::new(
//!     "/registry/secrets/default/s1",
//!     "k8s:enc:kms:v2:kmsprovider1:ciphertext",
//! )];
//! let report = analyze(&records, expected, "kmsprovider");
//! assert_eq!(report.encrypted_identities, vec!["default/s1"]);
//! assert!(report.all_match_expected_generation);
//! ```

pub mod analyzer;
pub mod classifier;
pub mod config;
pub mod error;
pub mod report;
pub mod resolver;
pub mod types;

pub use analyzer::analyze;
pub use classifier::{classify, KMS_ENVELOPE_PREFIX};
pub use config::{parse_duration, ConfigMapNames, EtcdConfig, ReporterConfig};
pub use error::{Error, ParseError, Result};
pub use report::{ReportData, ALL_SECRETS};
pub use resolver::{resolve_expected_generation, resolve_from_yaml, EncryptionConfiguration};
pub use types::{
    AnalysisReport, Classification, ExpectedGeneration, RawRecord, SkippedRecord,
    IDENTITY_GENERATION,
};
