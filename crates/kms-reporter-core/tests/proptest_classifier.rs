//! Property-based tests for record classification and analysis

use kms_reporter_core::{analyze, classify, ExpectedGeneration, RawRecord, KMS_ENVELOPE_PREFIX};
use proptest::prelude::*;

const PREFIX: &str = "kmsprovider";

/// Key segment without slashes
fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9.-]{0,20}"
}

/// Value that never starts with the KMS marker
fn plaintext_value() -> impl Strategy<Value = String> {
    ".{0,64}".prop_filter("must not carry the KMS marker", |v| {
        !v.starts_with(KMS_ENVELOPE_PREFIX)
    })
}

proptest! {
    /// Identity is always segments 3 and 4, whatever follows
    #[test]
    fn test_identity_from_segments(
        scheme in segment(),
        kind in segment(),
        namespace in segment(),
        name in segment(),
        rest in proptest::collection::vec(segment(), 0..4),
    ) {
        let mut key = format!("/{}/{}/{}/{}", scheme, kind, namespace, name);
        for extra in &rest {
            key.push('/');
            key.push_str(extra);
        }

        let c = classify(&key, "plain", PREFIX).unwrap();
        prop_assert_eq!(c.identity, format!("{}/{}", namespace, name));
    }

    /// Plaintext values are never encrypted and always carry generation 0
    #[test]
    fn test_plaintext_generation_zero(value in plaintext_value()) {
        let c = classify("/registry/secrets/default/s", &value, PREFIX).unwrap();
        prop_assert!(!c.encrypted);
        prop_assert_eq!(c.generation, 0);
    }

    /// Well-formed envelopes yield their embedded generation
    #[test]
    fn test_envelope_generation(generation in 0..=i64::MAX as u64, data in "[ -~]{0,64}") {
        let value = format!("k8s:enc:kms:v2:{}{}:{}", PREFIX, generation, data);
        let c = classify("/registry/secrets/default/s", &value, PREFIX).unwrap();
        prop_assert!(c.encrypted);
        prop_assert_eq!(c.generation, generation);
    }

    /// Every record lands in exactly one list or in the skipped diagnostics
    #[test]
    fn test_analysis_accounts_for_every_record(
        records in proptest::collection::vec(
            (
                prop_oneof![
                    Just("/registry/secrets/ns/a".to_string()),
                    Just("bad-key".to_string()),
                    "/[a-z/]{0,24}",
                ],
                prop_oneof![
                    Just("plain".to_string()),
                    (0u64..4).prop_map(|g| format!("k8s:enc:kms:v2:kmsprovider{}:x", g)),
                    Just("k8s:enc:kms:v2:broken".to_string()),
                ],
            ),
            0..32,
        ),
        expected in 0u64..4,
    ) {
        let records: Vec<RawRecord> = records
            .into_iter()
            .map(|(k, v)| RawRecord::new(k, v))
            .collect();
        let report = analyze(&records, ExpectedGeneration::Kms(expected), PREFIX);

        prop_assert_eq!(report.classified_count() + report.skipped.len(), records.len());
        if report.classified_count() == 0 {
            prop_assert!(report.all_match_expected_generation);
        }
    }
}
