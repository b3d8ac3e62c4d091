//! Value types shared by the classifier, resolver and analyzer

use crate::error::{Error, ParseError};
use serde::{Deserialize, Serialize, Serializer};

/// Sequence number reported for the identity (no encryption) provider
pub const IDENTITY_GENERATION: i64 = -1;

/// One storage entry as returned by the backing store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub key: String,
    pub value: String,
}

impl RawRecord {
    /// Create a new record
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Result of classifying one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Whether the value carries the KMS envelope marker
    pub encrypted: bool,

    /// `<namespace>/<name>` of the secret
    pub identity: String,

    /// Provider generation from the envelope, `0` for plaintext
    pub generation: u64,
}

impl Classification {
    /// Classification of an encrypted record
    pub fn encrypted(identity: impl Into<String>, generation: u64) -> Self {
        Self {
            encrypted: true,
            identity: identity.into(),
            generation,
        }
    }

    /// Classification of a plaintext record
    pub fn plaintext(identity: impl Into<String>) -> Self {
        Self {
            encrypted: false,
            identity: identity.into(),
            generation: 0,
        }
    }
}

/// Generation of the provider currently in effect for a name prefix
///
/// Serialized as a plain integer with `-1` for [`ExpectedGeneration::Identity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "GenerationRepr", try_from = "GenerationRepr")]
pub enum ExpectedGeneration {
    /// No matching KMS provider is configured; secrets are expected in plaintext
    Identity,
    /// KMS provider with the given generation
    Kms(u64),
}

impl ExpectedGeneration {
    /// Integer form, `-1` for identity; `None` if the generation exceeds `i64::MAX`
    pub fn as_i64(self) -> Option<i64> {
        match self {
            ExpectedGeneration::Identity => Some(IDENTITY_GENERATION),
            ExpectedGeneration::Kms(generation) => i64::try_from(generation).ok(),
        }
    }

    /// Whether a classified record agrees with this expectation.
    ///
    /// Plaintext records carry generation `0`, so they match `Kms(0)` as
    /// well as `Identity`.
    pub fn is_matched_by(self, classification: &Classification) -> bool {
        match self {
            ExpectedGeneration::Identity => !classification.encrypted,
            ExpectedGeneration::Kms(generation) => classification.generation == generation,
        }
    }
}

impl TryFrom<i64> for ExpectedGeneration {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value == IDENTITY_GENERATION {
            return Ok(ExpectedGeneration::Identity);
        }
        u64::try_from(value)
            .map(ExpectedGeneration::Kms)
            .map_err(|_| Error::invalid_config(format!("invalid provider generation: {}", value)))
    }
}

/// Wire form: `-1` or any unsigned generation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum GenerationRepr {
    Unsigned(u64),
    Signed(i64),
}

impl From<ExpectedGeneration> for GenerationRepr {
    fn from(value: ExpectedGeneration) -> Self {
        match value {
            ExpectedGeneration::Identity => GenerationRepr::Signed(IDENTITY_GENERATION),
            ExpectedGeneration::Kms(generation) => GenerationRepr::Unsigned(generation),
        }
    }
}

impl TryFrom<GenerationRepr> for ExpectedGeneration {
    type Error = Error;

    fn try_from(value: GenerationRepr) -> Result<Self, Self::Error> {
        match value {
            GenerationRepr::Unsigned(generation) => Ok(ExpectedGeneration::Kms(generation)),
            GenerationRepr::Signed(value) => ExpectedGeneration::try_from(value),
        }
    }
}

impl std::fmt::Display for ExpectedGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpectedGeneration::Identity => write!(f, "identity"),
            ExpectedGeneration::Kms(generation) => write!(f, "{}", generation),
        }
    }
}

/// A record the analyzer had to leave out of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub key: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: ParseError,
}

fn serialize_display<S: Serializer>(error: &ParseError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Aggregate verdict over one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Identities of secrets carrying the KMS envelope, in input order
    pub encrypted_identities: Vec<String>,

    /// Identities of secrets stored in plaintext, in input order
    pub plaintext_identities: Vec<String>,

    /// True when every classified record matched the expected generation
    pub all_match_expected_generation: bool,

    /// Records that could not be classified
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedRecord>,
}

impl AnalysisReport {
    /// Empty report; vacuously compliant
    pub fn new() -> Self {
        Self {
            encrypted_identities: Vec::new(),
            plaintext_identities: Vec::new(),
            all_match_expected_generation: true,
            skipped: Vec::new(),
        }
    }

    /// Number of classified records
    pub fn classified_count(&self) -> usize {
        self.encrypted_identities.len() + self.plaintext_identities.len()
    }

    /// True when no classified record is plaintext
    pub fn all_encrypted(&self) -> bool {
        self.plaintext_identities.is_empty()
    }
}

impl Default for AnalysisReport {
    fn default() -> Self {
        Self::new()
    }
}
