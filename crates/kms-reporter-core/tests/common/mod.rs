//! Shared fixtures for kms-reporter-core integration tests

#![allow(dead_code)]

use kms_reporter_core::RawRecord;

pub const PREFIX: &str = "kmsprovider";

/// Secret key in the layout the API server uses
pub fn secret_key(namespace: &str, name: &str) -> String {
    format!("/registry/secrets/{}/{}", namespace, name)
}

/// Record encrypted by `kmsprovider<generation>`
pub fn encrypted_record(namespace: &str, name: &str, generation: u64) -> RawRecord {
    RawRecord::new(
        secret_key(namespace, name),
        format!("k8s:enc:kms:v2:{}{}:ciphertext", PREFIX, generation),
    )
}

/// Record stored without encryption
pub fn plaintext_record(namespace: &str, name: &str) -> RawRecord {
    RawRecord::new(secret_key(namespace, name), "k8s\u{0}\n\u{c}\n\u{2}v1\u{12}\u{6}Secret")
}

/// Encryption configuration with the given providers under `secrets`
pub fn encryption_config(providers: &[&str]) -> String {
    let mut yaml = String::from(
        "apiVersion: apiserver.config.k8s.io/v1\n\
         kind: EncryptionConfiguration\n\
         resources:\n  - resources:\n      - secrets\n    providers:\n",
    );
    for provider in providers {
        if *provider == "identity" {
            yaml.push_str("      - identity: {}\n");
        } else {
            yaml.push_str(&format!(
                "      - kms:\n          apiVersion: v2\n          name: {}\n          endpoint: unix:///opt/kms.socket\n",
                provider
            ));
        }
    }
    yaml
}
