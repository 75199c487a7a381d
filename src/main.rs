//! Command/query gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                      GATEWAY                         │
//!                         │                                                      │
//!   Client Request        │  ┌────────┐   ┌──────────┐   ┌────────────────────┐  │
//!   ──────────────────────┼─▶│  http  │──▶│  routes  │──▶│      pipeline      │  │
//!                         │  │ server │   │          │   │ bind → authorize   │  │
//!                         │  └────────┘   └──────────┘   └─────────┬──────────┘  │
//!                         │                                        │             │
//!                         │              ┌─────────────────────────┴──────┐      │
//!                         │              ▼                                ▼      │
//!                         │     ┌─────────────────┐             ┌──────────────┐ │
//!                         │     │ validate +      │             │ storage      │ │
//!                         │     │ dispatcher      │             │ client       │─┼──▶ Storage
//!                         │     └────────┬────────┘             │ + cache      │ │    services
//!                         │              │                      └──────────────┘ │
//!                         │              ▼                                       │
//!                         │     ┌─────────────────┐                              │
//!                         │     │  command bus    │──────────────────────────────┼──▶ Command
//!                         │     │ pending table   │◀─────── POST /operations ────┼─── service
//!                         │     └─────────────────┘                              │
//!                         │                                                      │
//!                         │  config · observability · resilience · lifecycle     │
//!                         └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use command_gateway::cache::{CacheStore, InMemoryCache};
use command_gateway::commands::bus::run_loopback;
use command_gateway::commands::{ChannelBus, CommandBus, HttpCommandBus, PendingOperations};
use command_gateway::config::{load_config, GatewayConfig};
use command_gateway::observability::{logging, metrics};
use command_gateway::{routes, AppState, GatewayServer, Shutdown};

#[derive(Parser)]
#[command(name = "command-gateway")]
#[command(about = "HTTP gateway for commands and queries", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "command-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        storage = %config.storage.base_url,
        bus = config.bus.endpoint.as_deref().unwrap_or("in-process"),
        await_outcome = config.dispatch.await_outcome,
        "Configuration loaded"
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

    let shutdown = Shutdown::new();
    let pending = PendingOperations::new();
    let cache = InMemoryCache::new();

    let bus: Arc<dyn CommandBus> = match &config.bus.endpoint {
        Some(endpoint) => Arc::new(HttpCommandBus::new(
            endpoint,
            Duration::from_secs(config.bus.publish_timeout_secs),
        )?),
        None => {
            tracing::warn!("No command bus endpoint configured, acknowledging commands in-process");
            let (bus, rx) = ChannelBus::new(config.bus.channel_capacity);
            tokio::spawn(run_loopback(rx, pending.clone(), shutdown.subscribe()));
            Arc::new(bus)
        }
    };

    tokio::spawn(pending.clone().run_reaper(
        Duration::from_secs(config.dispatch.reaper_interval_secs),
        shutdown.subscribe(),
    ));
    if config.cache.sweep_interval_secs > 0 {
        tokio::spawn(cache.clone().run_sweeper(
            Duration::from_secs(config.cache.sweep_interval_secs),
            shutdown.subscribe(),
        ));
    }

    let bind_address = config.listener.bind_address.clone();
    let cache: Arc<dyn CacheStore> = Arc::new(cache);
    let state = AppState::new(config, bus, pending, cache, routes::validators(), routes::filters())?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    tokio::spawn(shutdown.clone().trigger_on_ctrl_c());
    GatewayServer::new(state).run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
