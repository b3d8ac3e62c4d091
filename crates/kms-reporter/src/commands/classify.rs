//! Classify command - one key and value through the record classifier

use anyhow::{Context, Result};
use camino::Utf8Path;
use kms_reporter_core::classify;

use crate::cli::{load_config, ClassifyArgs};
use crate::output::{self, OutputFormat};

pub fn run(args: ClassifyArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let format = OutputFormat::parse(&args.format);
    let config = args.provider.apply(load_config(config_path)?);

    let classification = classify(&args.key, &args.value, &config.kms_provider_name)
        .with_context(|| format!("Failed to classify {}", args.key))?;
    println!("{}", output::format_classification(&classification, format));

    Ok(())
}
