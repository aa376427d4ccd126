//! Default command: mirror the configured tree and follow its changes

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use mirror_core::{DispatchOptions, Monitor, MonitorOptions, SqliteChangeLog};
use tokio_util::sync::CancellationToken;

use super::load_setting;
use crate::error::Result;

pub async fn run_watch(
    config: &Path,
    database: &Path,
    backup: Option<&Path>,
    max_in_flight: usize,
) -> Result<()> {
    let setting = load_setting(config, backup)?;
    let sink = Arc::new(SqliteChangeLog::open(database)?);
    let cancel = CancellationToken::new();
    let options = MonitorOptions {
        dispatch: DispatchOptions {
            max_in_flight,
            ..DispatchOptions::default()
        },
        ..MonitorOptions::default()
    };

    let mut monitor = Monitor::bootstrap(&setting, sink, options, cancel.clone()).await?;
    eprintln!(
        "{} {} -> {}",
        "Watching".green().bold(),
        monitor.roots().source,
        monitor.roots().backup
    );

    tokio::select! {
        _ = monitor.run() => {
            tracing::warn!("notification stream closed");
        }
        () = shutdown_signal() => {
            tracing::debug!("interrupt received");
            cancel.cancel();
        }
    }

    let stats = monitor.stats();
    tracing::info!(
        accepted = stats.accepted(),
        skipped = stats.skipped(),
        sync_failed = stats.sync_failed,
        hook_failed = stats.hook_failed,
        "monitor stopped"
    );
    println!("finished");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
