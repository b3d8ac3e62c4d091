//! Scan command - one analysis, printed

use anyhow::{Context, Result};
use camino::Utf8Path;
use chrono::Utc;
use kms_reporter_agent::{build_read_operation, ReadOutcome};
use kms_reporter_core::AnalysisReport;

use crate::cli::{load_config, ScanArgs};
use crate::output::{self, OutputFormat, ScanOutput};

pub async fn run(args: ScanArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let format = OutputFormat::parse(&args.format);
    let config = args.cluster.apply(load_config(config_path)?);

    config.validate().context("invalid settings")?;
    config.validate_etcd().context("invalid settings")?;

    let reader = build_read_operation(&config, args.encryption_config.as_deref(), args.record)?;
    let outcome = reader.read().await?;

    let scan = match outcome {
        ReadOutcome::NoSecrets => ScanOutput {
            scanned_at: Utc::now(),
            expected_generation: None,
            recorded: false,
            report: AnalysisReport::new(),
        },
        ReadOutcome::Analyzed {
            expected,
            report,
            recorded,
        } => ScanOutput {
            scanned_at: Utc::now(),
            expected_generation: Some(expected),
            recorded,
            report,
        },
    };

    println!("{}", output::format_scan(&scan, format));

    if format == OutputFormat::Human {
        if !scan.report.skipped.is_empty() {
            output::warning(&format!(
                "{} record(s) could not be parsed",
                scan.report.skipped.len()
            ));
        }
        if scan.recorded {
            output::success(&format!(
                "Report recorded in ConfigMap {}/{}",
                config.namespace, config.config_maps.report
            ));
        }
    }

    Ok(())
}
