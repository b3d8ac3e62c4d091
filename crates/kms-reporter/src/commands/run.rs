//! Run command - periodic analysis until SIGINT/SIGTERM

use anyhow::{Context, Result};
use camino::Utf8Path;
use kms_reporter_agent::{build_read_operation, run_periodically, shutdown_signal};
use tracing::info;

use crate::cli::{load_config, RunArgs};

pub async fn run(args: RunArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let mut config = args.cluster.apply(load_config(config_path)?);
    if let Some(interval) = args.run_interval {
        config = config.with_run_interval(interval);
    }

    config.validate().context("invalid settings")?;
    config.validate_etcd().context("invalid settings")?;

    let reader = build_read_operation(&config, None, true)?;

    info!(
        "Starting kms-reporter in namespace {} (interval {}s)",
        config.namespace, config.run_interval_secs
    );
    let runs = run_periodically(&reader, config.run_interval(), shutdown_signal()).await;
    info!("Stopped after {} run(s)", runs);

    Ok(())
}
