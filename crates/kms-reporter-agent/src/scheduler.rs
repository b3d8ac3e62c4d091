//! Periodic runs and graceful shutdown

use crate::reader::{ReadOperation, ReadOutcome};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Run `reader` immediately and then once per `interval` until `shutdown` completes.
///
/// Runs never overlap. A failed run is logged and the loop carries on with
/// the next tick. An in-flight run is abandoned when `shutdown` fires.
///
/// Returns the number of runs started.
pub async fn run_periodically<F>(reader: &ReadOperation, interval: Duration, shutdown: F) -> usize
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut runs = 0;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        runs += 1;
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            result = reader.read() => log_outcome(result),
        }
    }

    info!("Received termination signal, shutting down gracefully...");
    runs
}

fn log_outcome(result: anyhow::Result<ReadOutcome>) {
    match result {
        Ok(ReadOutcome::NoSecrets) => {}
        Ok(ReadOutcome::Analyzed { recorded, .. }) => {
            if recorded {
                info!("Read etcd successfully");
            }
        }
        Err(e) => error!("Failed to read etcd: {:#}", e),
    }
}

/// Completes on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
