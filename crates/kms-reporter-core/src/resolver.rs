//! Expected provider generation resolution
//!
//! Reads the API server's `EncryptionConfiguration` and finds the generation
//! of the KMS provider currently used to write new secrets.
//!
//! ```yaml
//! apiVersion: apiserver.config.k8s.io/v1
//! kind: EncryptionConfiguration
//! resources:
//!   - resources: [secrets]
//!     providers:
//!       - kms:
//!           apiVersion: v2
//!           name: kmsprovider2
//!           endpoint: unix:///opt/kms.socket
//!       - identity: {}
//! ```

use crate::classifier::parse_generation_digits;
use crate::error::{Error, Result};
use crate::types::ExpectedGeneration;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Encryption configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Resource rules, in priority order
    #[serde(default)]
    pub resources: Vec<ResourceRule>,
}

/// Providers applied to a set of resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRule {
    /// Providers in priority order; the first one encrypts new writes
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,

    /// Resource names, e.g. `secrets`
    #[serde(default)]
    pub resources: Vec<String>,
}

/// One provider entry.
///
/// Other provider kinds (`aescbc`, `secretbox`, ...) are accepted and ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms: Option<KmsProvider>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityProvider>,
}

/// KMS provider settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KmsProvider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub endpoint: String,
}

/// No-op provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProvider {}

impl EncryptionConfiguration {
    /// Parse a configuration document.
    ///
    /// A blank document is well formed and has no providers.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(text).map_err(Error::ConfigParse)
    }

    /// All KMS providers in document order
    pub fn kms_providers(&self) -> impl Iterator<Item = &KmsProvider> {
        self.resources
            .iter()
            .flat_map(|rule| rule.providers.iter())
            .filter_map(|provider| provider.kms.as_ref())
    }
}

/// Resolve the expected generation for a provider-name prefix.
///
/// The first KMS provider named `<prefix><digits>` wins, scanning rules and
/// then providers in document order. KMS providers with other names are
/// skipped. Without a match the identity provider is expected.
pub fn resolve_expected_generation(
    config: &EncryptionConfiguration,
    provider_prefix: &str,
) -> ExpectedGeneration {
    for kms in config.kms_providers() {
        match provider_generation(&kms.name, provider_prefix) {
            Some(generation) => {
                debug!(
                    "KMS provider '{}' sets expected generation {}",
                    kms.name, generation
                );
                return ExpectedGeneration::Kms(generation);
            }
            None => debug!(
                "Skipping KMS provider '{}': name does not match '{}<generation>'",
                kms.name, provider_prefix
            ),
        }
    }

    ExpectedGeneration::Identity
}

/// Parse a configuration document and resolve the expected generation
pub fn resolve_from_yaml(text: &str, provider_prefix: &str) -> Result<ExpectedGeneration> {
    let config = EncryptionConfiguration::from_yaml(text)?;
    Ok(resolve_expected_generation(&config, provider_prefix))
}

/// Generation encoded in a provider name, if it is `<prefix><digits>`
pub fn provider_generation(name: &str, provider_prefix: &str) -> Option<u64> {
    name.strip_prefix(provider_prefix)
        .and_then(parse_generation_digits)
}
