//! Error types for kms-reporter-core

use thiserror::Error;

/// Result type alias using kms-reporter-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for kms-reporter
#[derive(Error, Debug)]
pub enum Error {
    /// The encryption configuration document could not be parsed
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[source] serde_yaml_ng::Error),

    /// Reporter settings file not found
    #[error("Settings file not found: {path}")]
    SettingsNotFound { path: String },

    /// Reporter settings file is not valid YAML for the settings schema
    #[error("Invalid settings file {path}: {source}")]
    SettingsParse {
        path: String,
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// Reporter settings failed validation
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Duration value could not be parsed
    #[error("Invalid duration '{value}': expected seconds or a number with s, m or h suffix")]
    InvalidDuration { value: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a settings not found error
    pub fn settings_not_found(path: impl Into<String>) -> Self {
        Self::SettingsNotFound { path: path.into() }
    }

    /// Create an invalid duration error
    pub fn invalid_duration(value: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
        }
    }
}

/// Why a single etcd key/value pair could not be classified.
///
/// These are recoverable: the analyzer skips the record and keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Key does not follow `/<scheme>/<kind>/<namespace>/<name>`
    #[error("invalid key format: {key}")]
    InvalidKeyFormat { key: String },

    /// Value carries the KMS marker but has too few colon-delimited fields
    #[error("invalid encrypted value format: expected at least 6 fields, found {fields}")]
    InvalidEnvelope { fields: usize },

    /// Provider field of the envelope does not start with the configured prefix
    #[error("unexpected KMS provider '{provider}': expected prefix '{prefix}'")]
    UnexpectedProvider { provider: String, prefix: String },

    /// Provider suffix is not a non-negative integer
    #[error("failed to convert generation to int: '{suffix}'")]
    InvalidGeneration { suffix: String },
}

impl ParseError {
    /// Create an invalid key format error
    pub fn invalid_key_format(key: impl Into<String>) -> Self {
        Self::InvalidKeyFormat { key: key.into() }
    }

    /// Create an unexpected provider error
    pub fn unexpected_provider(provider: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::UnexpectedProvider {
            provider: provider.into(),
            prefix: prefix.into(),
        }
    }

    /// Create an invalid generation error
    pub fn invalid_generation(suffix: impl Into<String>) -> Self {
        Self::InvalidGeneration {
            suffix: suffix.into(),
        }
    }
}
