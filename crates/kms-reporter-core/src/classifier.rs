//! Record classification
//!
//! Turns one etcd key/value pair into a [`Classification`].
//!
//! Sample key: `/registry/secrets/kube-system/bootstrap-token-ldeus6`
//! Sample value: `k8s:enc:kms:v2:kmsprovider1:<ciphertext>`
//!
//! Only the envelope metadata is inspected; the ciphertext is never touched.

use crate::error::ParseError;
use crate::types::Classification;

/// Marker the API server writes in front of KMS-encrypted values
pub const KMS_ENVELOPE_PREFIX: &str = "k8s:enc:kms:";

/// `"", scheme, kind, namespace, name`
const MIN_KEY_SEGMENTS: usize = 5;

/// `k8s, enc, kms, version, provider, ciphertext`
const MIN_ENVELOPE_FIELDS: usize = 6;

const PROVIDER_FIELD: usize = 4;

/// Classify one etcd record.
///
/// # Arguments
///
/// * `key` - etcd key, e.g. `/registry/secrets/default/mysecret`
/// * `value` - stored value, KMS envelope or plaintext
/// * `provider_prefix` - KMS provider name without its generation suffix
///
/// # Errors
///
/// Returns a [`ParseError`] when the key has fewer than five slash-delimited
/// segments, or when an encrypted value has a malformed envelope.
pub fn classify(key: &str, value: &str, provider_prefix: &str) -> Result<Classification, ParseError> {
    let encrypted = is_kms_encrypted(value);
    let identity = parse_identity(key)?;

    if !encrypted {
        return Ok(Classification::plaintext(identity));
    }

    let generation = parse_envelope_generation(value, provider_prefix)?;
    Ok(Classification::encrypted(identity, generation))
}

/// Whether the value carries the KMS envelope marker
pub fn is_kms_encrypted(value: &str) -> bool {
    value.starts_with(KMS_ENVELOPE_PREFIX)
}

/// Extract `<namespace>/<name>` from a storage key.
///
/// Segments past the name are dropped: `/registry/secrets/ns/a/b` gives `ns/a`.
pub fn parse_identity(key: &str) -> Result<String, ParseError> {
    let segments: Vec<&str> = key.splitn(MIN_KEY_SEGMENTS + 1, '/').collect();
    if segments.len() < MIN_KEY_SEGMENTS {
        return Err(ParseError::invalid_key_format(key));
    }

    Ok(format!("{}/{}", segments[3], segments[4]))
}

/// Extract the provider generation from a KMS envelope
fn parse_envelope_generation(value: &str, provider_prefix: &str) -> Result<u64, ParseError> {
    // The ciphertext may itself contain colons, so stop splitting after the provider field
    let fields: Vec<&str> = value.splitn(MIN_ENVELOPE_FIELDS, ':').collect();
    if fields.len() < MIN_ENVELOPE_FIELDS {
        return Err(ParseError::InvalidEnvelope {
            fields: fields.len(),
        });
    }

    let provider = fields[PROVIDER_FIELD];
    let suffix = provider
        .strip_prefix(provider_prefix)
        .ok_or_else(|| ParseError::unexpected_provider(provider, provider_prefix))?;

    parse_generation_digits(suffix).ok_or_else(|| ParseError::invalid_generation(suffix))
}

/// Parse a generation suffix made only of ASCII digits.
///
/// Signs, whitespace and the empty string are rejected, as are values above
/// `i64::MAX`, the largest generation the API server can write.
pub(crate) fn parse_generation_digits(suffix: &str) -> Option<u64> {
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix
        .parse::<u64>()
        .ok()
        .filter(|generation| i64::try_from(*generation).is_ok())
}
