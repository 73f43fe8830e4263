//! denyfile-server
//!
//! Serves static files and refuses any request whose directory, or one of
//! its ancestors up to the document root, contains a deny marker file.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ ┌──────────┐   ┌────────────┐   ┌──────────────────────┐
//!                     │  http    │──▶│  routing   │──▶│  pipeline            │
//!                     │  server  │   │  scope     │   │  post-read → access  │
//!                     └──────────┘   │  lookup    │   │  (denyfile search)   │
//!                                    └────────────┘   └─────────┬────────────┘
//!                                                    403/400/500 │  declined
//!     Client Response                                            ▼
//!     ◀───────────────────────────────────────────── ┌──────────────────────┐
//!                                                    │ content (static file)│
//!                                                    └──────────────────────┘
//!
//!     Cross-cutting: config (+ reload) · observability · lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use denyfile_server::config::watcher::ConfigWatcher;
use denyfile_server::config::{load_config, ServerConfig};
use denyfile_server::lifecycle::{signals, Shutdown};
use denyfile_server::observability::{logging, metrics};
use denyfile_server::HttpServer;

#[derive(Parser)]
#[command(name = "denyfile-server")]
#[command(about = "Static file server with deny-marker access control", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the configuration file when it changes.
    #[arg(short, long, requires = "config")]
    watch: bool,

    /// Validate the configuration and exit.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    if cli.check_config {
        HttpServer::new(config)?;
        println!("configuration ok");
        return Ok(());
    }

    logging::init(&config.observability.log_level)?;
    tracing::info!("denyfile-server v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        servers = config.servers.len(),
        offload_probes = config.access.offload_probes,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let (config_updates, _watcher) = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        _ => (mpsc::unbounded_channel().1, None),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
