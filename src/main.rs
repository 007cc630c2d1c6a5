//! rr-balancer
//!
//! A round-robin HTTP load balancer built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────────┐
//!                      │                   RR-BALANCER                      │
//!                      │                                                   │
//!   Client Request     │  ┌────────┐    ┌────────────┐    ┌────────────┐   │
//!   ───────────────────┼─▶│  http  │───▶│ dispatcher │───▶│ ServerPool │   │
//!                      │  │ server │    │ (failover) │    │ round-robin│   │
//!                      │  └────────┘    └─────┬──────┘    └─────┬──────┘   │
//!                      │                      │ forward         │ peer     │
//!                      │                      ▼                 ▼          │
//!   Client Response    │               ┌────────────┐    ┌────────────┐     │
//!   ◀──────────────────┼───────────────│ forwarder  │◀───│  Backend   │─────┼──▶ Backend
//!                      │               └────────────┘    └─────▲──────┘     │    Servers
//!                      │                                       │ alive?     │
//!                      │                              ┌────────┴───────┐    │
//!                      │                              │ health checker │────┼──▶ probes
//!                      │                              └────────────────┘    │
//!                      └───────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use rr_balancer::config::loader;
use rr_balancer::lifecycle::signals::wait_for_termination;
use rr_balancer::observability::{logging, metrics};
use rr_balancer::{HttpServer, ProxyConfig, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "rr-balancer", version, about = "Round-robin HTTP load balancer with health checks")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Comma-separated backend addresses; replaces the configured list.
    #[arg(short, long, value_delimiter = ',')]
    backends: Vec<String>,

    /// Port to listen on; replaces the configured bind address.
    #[arg(short, long)]
    port: Option<u16>,
}

impl Cli {
    fn apply(&self, config: &mut ProxyConfig) {
        if !self.backends.is_empty() {
            config.backends = self
                .backends
                .iter()
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty())
                .collect();
        }
        if let Some(port) = self.port {
            config.listener.bind_address = SocketAddr::from(([0, 0, 0, 0], port)).to_string();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => loader::read_config(path)?,
        None => ProxyConfig::default(),
    };
    cli.apply(&mut config);
    loader::validate(&config)?;

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rr-balancer starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        health_interval_secs = config.health_check.interval_secs,
        max_retries = config.retries.max_retries,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::new(config.clone())?;
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Load balancer started");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_termination().await;
        trigger.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
