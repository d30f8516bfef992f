//! OS signal handling.
//!
//! # Responsibilities
//! - SIGINT / SIGTERM trigger graceful shutdown; a second one exits at once
//! - SIGHUP re-reads the configuration file and queues it for reload
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers config reload, not shutdown

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::config::{load_config, GatewayConfig};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Exit code used when a second termination signal forces exit.
const FORCED_EXIT_CODE: i32 = 130;

/// Watch process signals until the process exits.
#[cfg(unix)]
pub async fn handle_signals(
    shutdown: Shutdown,
    config_path: Option<PathBuf>,
    updates: mpsc::UnboundedSender<GatewayConfig>,
) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut term, mut hup) = match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
        (Ok(term), Ok(hup)) => (term, hup),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return;
        }
    };

    let mut requested = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => on_terminate(&shutdown, &mut requested),
            _ = term.recv() => on_terminate(&shutdown, &mut requested),
            _ = hup.recv() => reload_from(config_path.as_ref(), &updates),
        }
    }
}

/// Watch process signals until the process exits.
#[cfg(not(unix))]
pub async fn handle_signals(
    shutdown: Shutdown,
    _config_path: Option<PathBuf>,
    _updates: mpsc::UnboundedSender<GatewayConfig>,
) {
    let mut requested = false;
    while tokio::signal::ctrl_c().await.is_ok() {
        on_terminate(&shutdown, &mut requested);
    }
}

fn on_terminate(shutdown: &Shutdown, requested: &mut bool) {
    if *requested {
        tracing::warn!("Second termination signal received, exiting immediately");
        std::process::exit(FORCED_EXIT_CODE);
    }
    *requested = true;
    tracing::info!("Shutdown signal received, draining");
    shutdown.trigger();
}

#[cfg_attr(not(unix), allow(dead_code))]
fn reload_from(path: Option<&PathBuf>, updates: &mpsc::UnboundedSender<GatewayConfig>) {
    let Some(path) = path else {
        tracing::warn!("SIGHUP received but no configuration file is in use");
        return;
    };

    tracing::info!(path = %path.display(), "SIGHUP received, reloading configuration");
    match load_config(path) {
        Ok(config) => {
            let _ = updates.send(config);
        }
        Err(e) => {
            metrics::record_reload("failure");
            tracing::error!(error = %e, "Failed to reload config. Keeping current route table.");
        }
    }
}
