//! Range lookup proxy.
//!
//! Sits in front of a breached-password range API, validates `/range/{prefix}`
//! requests, forwards them, and optionally pads successful responses so their
//! size no longer reveals how many suffixes the bucket holds.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                   RANGE PROXY                     │
//!                      │                                                   │
//!   Client Request     │  ┌─────────┐    ┌───────────┐                     │
//!   ───────────────────┼─▶│  http   │───▶│   range   │── reject ──┐        │
//!                      │  │ server  │    │ validator │            │        │
//!                      │  └─────────┘    └─────┬─────┘            │        │
//!                      │                       │ forward          │        │
//!                      │            ┌──────────┴──────────┐       │        │
//!                      │            ▼                     ▼       │        │
//!                      │   ┌────────────────┐    ┌─────────────┐  │        │
//!                      │   │   upstream     │    │  padding    │  │        │
//!                      │   │ cache + fetch  │    │ generator   │  │        │
//!                      │   └───────┬────────┘    └──────┬──────┘  │        │
//!                      │           └─────── join ───────┘         │        │
//!   Client Response    │                    ▼                     │        │
//!   ◀──────────────────┼──────────── response assembly ◀──────────┘        │
//!                      │                                                   │
//!                      │   config (TOML + hot reload) · observability ·    │
//!                      │   lifecycle (signals, graceful shutdown)          │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use range_proxy::config::{load_config, watcher::ConfigWatcher, ProxyConfig};
use range_proxy::lifecycle::{signals, Shutdown};
use range_proxy::observability::{logging, metrics};
use range_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "range-proxy")]
#[command(about = "Padding proxy for k-anonymity password range lookups", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file; watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        padding_enabled = config.padding.enabled,
        cache_enabled = config.cache.enabled,
        "range-proxy starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config)?;

    tokio::spawn(async move {
        signals::trigger_on_termination(&shutdown).await;
    });

    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
