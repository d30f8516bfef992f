//! Edge gateway
//!
//! Accepts client requests, resolves them against the route table, serves
//! cached responses where a route allows it and forwards everything else to
//! the downstream service over HTTP or gRPC.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ http server ──▶ gateway pipeline ──▶ routing matcher
//!                                   │
//!                     ┌─────────────┴─────────────┐
//!                     ▼                           ▼
//!                cache store             dispatch (timeout)
//!                                          ├─ http ──▶ ordering service
//!                                          └─ rpc  ──▶ discount service (gRPC)
//!
//!   Cross-cutting: config + watcher, admin API, observability, lifecycle
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use edge_gateway::config::{load_config, resolve_config_path, ConfigWatcher, DEFAULT_PROFILE};
use edge_gateway::lifecycle::{handle_signals, Shutdown};
use edge_gateway::observability::{logging, metrics};
use edge_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "edge-gateway", version)]
#[command(about = "Edge gateway with route matching, response caching and HTTP/gRPC dispatch", long_about = None)]
struct Cli {
    /// Configuration file. Takes precedence over --config-dir/--profile.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding gateway.<profile>.toml files.
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Configuration profile, e.g. Development or Production.
    #[arg(short, long, env = "GATEWAY_PROFILE", default_value = DEFAULT_PROFILE)]
    profile: String,

    /// Do not watch the configuration file for changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| resolve_config_path(&cli.config_dir, &cli.profile));

    // No valid route table means nothing to serve.
    let config = match load_config(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("edge-gateway: failed to load {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %path.display(),
        profile = %cli.profile,
        "edge-gateway starting"
    );

    if config.observability.metrics_enabled {
        // Validation already checked the address.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            if let Err(e) = metrics::init_metrics(addr) {
                tracing::error!(error = %e, "Failed to start Prometheus exporter");
            }
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let server = match GatewayServer::new(config) {
        Ok(server) => server.with_config_path(path.clone()),
        Err(e) => {
            tracing::error!(error = %e, "Invalid route configuration");
            eprintln!("edge-gateway: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let listener = match TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %bind_address, error = %e, "Failed to bind listener");
            return ExitCode::FAILURE;
        }
    };

    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let shutdown = Shutdown::new();

    // Keep the watcher alive for the lifetime of the server.
    let _watcher = if cli.no_watch {
        None
    } else {
        match ConfigWatcher::new(&path, update_tx.clone()).run() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!(error = %e, "Config watcher unavailable, hot reload limited to SIGHUP and admin API");
                None
            }
        }
    };

    tokio::spawn(handle_signals(shutdown.clone(), Some(path), update_tx));

    match server.run(listener, update_rx, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Gateway server failed");
            ExitCode::FAILURE
        }
    }
}
