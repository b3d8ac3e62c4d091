//! Terminal output
//!
//! Status line helpers plus formatting of reports in human, JSON and YAML form.

use chrono::{DateTime, Utc};
use kms_reporter_core::{AnalysisReport, Classification, ExpectedGeneration};
use owo_colors::OwoColorize;
use serde::Serialize;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), msg);
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable colored output
    #[default]
    Human,
    /// JSON format for machine consumption
    Json,
    /// YAML format for machine consumption
    Yaml,
}

impl OutputFormat {
    /// Parse a `--format` value; anything unknown falls back to human
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "yaml" | "yml" => OutputFormat::Yaml,
            _ => OutputFormat::Human,
        }
    }
}

/// Result of a single scan
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutput {
    pub scanned_at: DateTime<Utc>,

    /// Unset when the snapshot was empty and nothing was resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_generation: Option<ExpectedGeneration>,

    pub recorded: bool,

    #[serde(flatten)]
    pub report: AnalysisReport,
}

/// Expected generation resolved from a file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOutput {
    pub file: String,
    pub provider_prefix: String,
    pub expected_generation: ExpectedGeneration,
}

pub fn format_scan(output: &ScanOutput, format: OutputFormat) -> String {
    match format {
        OutputFormat::Human => format_scan_human(output),
        OutputFormat::Json => to_json(output),
        OutputFormat::Yaml => to_yaml(output),
    }
}

pub fn format_resolve(output: &ResolveOutput, format: OutputFormat) -> String {
    match format {
        OutputFormat::Human => format!(
            "Expected generation for {}: {}",
            output.file,
            output.expected_generation.bold()
        ),
        OutputFormat::Json => to_json(output),
        OutputFormat::Yaml => to_yaml(output),
    }
}

pub fn format_classification(classification: &Classification, format: OutputFormat) -> String {
    match format {
        OutputFormat::Human => {
            if classification.encrypted {
                format!(
                    "{}: {} (generation {})",
                    classification.identity,
                    "encrypted".green(),
                    classification.generation
                )
            } else {
                format!("{}: {}", classification.identity, "not encrypted".yellow())
            }
        }
        OutputFormat::Json => to_json(classification),
        OutputFormat::Yaml => to_yaml(classification),
    }
}

fn format_scan_human(output: &ScanOutput) -> String {
    let report = &output.report;
    let mut text = String::new();

    text.push_str(&format!("{}\n", "KMS Encryption Report".bold()));
    text.push_str(&format!(
        "Scanned at: {}\n",
        output.scanned_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    let Some(expected) = output.expected_generation else {
        text.push_str(&format!("{}\n", "No secrets found".yellow()));
        return text;
    };
    text.push_str(&format!("Expected generation: {}\n\n", expected));

    text.push_str(&format_list("Encrypted", &report.encrypted_identities));
    text.push_str(&format_list("Unencrypted", &report.plaintext_identities));

    if !report.skipped.is_empty() {
        text.push_str(&format!(
            "{} ({}):\n",
            "Skipped".yellow(),
            report.skipped.len()
        ));
        for skipped in &report.skipped {
            text.push_str(&format!("  {} {}\n", skipped.key.dimmed(), skipped.error));
        }
    }

    text.push('\n');
    if report.all_match_expected_generation {
        text.push_str(&format!(
            "{} All {} secret(s) match the expected generation\n",
            "✓".green().bold(),
            report.classified_count()
        ));
    } else {
        text.push_str(&format!(
            "{} Some secrets do not match the expected generation\n",
            "✗".red().bold()
        ));
    }

    text
}

fn format_list(label: &str, identities: &[String]) -> String {
    if identities.is_empty() {
        return format!("{} (0)\n", label.bold());
    }

    let mut text = format!("{} ({}):\n", label.bold(), identities.len());
    for identity in identities {
        text.push_str(&format!("  {}\n", identity));
    }
    text
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize: {}\"}}", e))
}

fn to_yaml<T: Serialize>(value: &T) -> String {
    serde_yaml_ng::to_string(value)
        .unwrap_or_else(|e| format!("error: \"Failed to serialize: {}\"", e))
}
