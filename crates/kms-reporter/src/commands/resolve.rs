//! Resolve command - expected generation of a local encryption configuration

use anyhow::{Context, Result};
use camino::Utf8Path;
use kms_reporter_core::resolve_from_yaml;

use crate::cli::{load_config, ResolveArgs};
use crate::output::{self, OutputFormat, ResolveOutput};

pub fn run(args: ResolveArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let format = OutputFormat::parse(&args.format);
    let config = args.provider.apply(load_config(config_path)?);

    let document = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file))?;
    let expected = resolve_from_yaml(&document, &config.kms_provider_name)
        .with_context(|| format!("Failed to resolve {}", args.file))?;

    let result = ResolveOutput {
        file: args.file.to_string(),
        provider_prefix: config.kms_provider_name,
        expected_generation: expected,
    };
    println!("{}", output::format_resolve(&result, format));

    Ok(())
}
