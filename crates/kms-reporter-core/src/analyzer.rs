//! Batch analysis of an etcd snapshot

use crate::classifier::classify;
use crate::types::{AnalysisReport, ExpectedGeneration, RawRecord, SkippedRecord};

/// Classify every record and reduce the results into one report.
///
/// Records that cannot be classified are left out of both identity lists
/// and listed in [`AnalysisReport::skipped`]; the batch always completes.
pub fn analyze(
    records: &[RawRecord],
    expected: ExpectedGeneration,
    provider_prefix: &str,
) -> AnalysisReport {
    let mut report = AnalysisReport::new();

    for record in records {
        let classification = match classify(&record.key, &record.value, provider_prefix) {
            Ok(c) => c,
            Err(error) => {
                report.skipped.push(SkippedRecord {
                    key: record.key.clone(),
                    error,
                });
                continue;
            }
        };

        if !expected.is_matched_by(&classification) {
            report.all_match_expected_generation = false;
        }

        if classification.encrypted {
            report.encrypted_identities.push(classification.identity);
        } else {
            report.plaintext_identities.push(classification.identity);
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;

    const PREFIX: &str = "kmsprovider";

    fn encrypted_s1() -> RawRecord {
        RawRecord::new(
            "/registry/secrets/default/s1",
            "k8s:enc:kms:v2:kmsprovider1:x",
        )
    }

    fn plaintext_s2() -> RawRecord {
        RawRecord::new("/registry/secrets/ns/s2", "plain")
    }

    #[test]
    fn test_empty_batch() {
        let report = analyze(&[], ExpectedGeneration::Kms(4), PREFIX);
        assert!(report.encrypted_identities.is_empty());
        assert!(report.plaintext_identities.is_empty());
        assert!(report.all_match_expected_generation);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_mixed_batch_does_not_match() {
        let report = analyze(
            &[encrypted_s1(), plaintext_s2()],
            ExpectedGeneration::Kms(1),
            PREFIX,
        );
        assert_eq!(report.encrypted_identities, vec!["default/s1"]);
        assert_eq!(report.plaintext_identities, vec!["ns/s2"]);
        assert!(!report.all_match_expected_generation);
    }

    #[test]
    fn test_all_encrypted_with_expected_generation() {
        let report = analyze(&[encrypted_s1()], ExpectedGeneration::Kms(1), PREFIX);
        assert_eq!(report.encrypted_identities, vec!["default/s1"]);
        assert!(report.plaintext_identities.is_empty());
        assert!(report.all_match_expected_generation);
    }

    #[test]
    fn test_stale_generation_flips_flag_permanently() {
        let records = vec![
            RawRecord::new("/registry/secrets/a/old", "k8s:enc:kms:v2:kmsprovider1:x"),
            RawRecord::new("/registry/secrets/a/new1", "k8s:enc:kms:v2:kmsprovider2:x"),
            RawRecord::new("/registry/secrets/a/new2", "k8s:enc:kms:v2:kmsprovider2:x"),
        ];
        let report = analyze(&records, ExpectedGeneration::Kms(2), PREFIX);
        assert_eq!(report.encrypted_identities.len(), 3);
        assert!(!report.all_match_expected_generation);
    }

    #[test]
    fn test_unparsable_records_are_skipped() {
        let records = vec![
            RawRecord::new("invalid-key", "plain"),
            encrypted_s1(),
            RawRecord::new("/registry/secrets/default/broken", "k8s:enc:kms:v2:kmsprovider1"),
        ];
        let report = analyze(&records, ExpectedGeneration::Kms(1), PREFIX);

        assert_eq!(report.encrypted_identities, vec!["default/s1"]);
        assert!(report.plaintext_identities.is_empty());
        assert!(report.all_match_expected_generation);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].key, "invalid-key");
        assert_eq!(
            report.skipped[0].error,
            ParseError::invalid_key_format("invalid-key")
        );
        assert_eq!(
            report.skipped[1].error,
            ParseError::InvalidEnvelope { fields: 5 }
        );
    }

    #[test]
    fn test_identity_expectation() {
        let report = analyze(&[plaintext_s2()], ExpectedGeneration::Identity, PREFIX);
        assert!(report.all_match_expected_generation);

        let report = analyze(
            &[plaintext_s2(), encrypted_s1()],
            ExpectedGeneration::Identity,
            PREFIX,
        );
        assert!(!report.all_match_expected_generation);
    }

    #[test]
    fn test_input_order_is_preserved() {
        let records = vec![
            RawRecord::new("/registry/secrets/z/last", "p"),
            RawRecord::new("/registry/secrets/a/first", "p"),
        ];
        let report = analyze(&records, ExpectedGeneration::Kms(0), PREFIX);
        assert_eq!(report.plaintext_identities, vec!["z/last", "a/first"]);
    }
}
