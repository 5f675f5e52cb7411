//! Service dispatch gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ http server ──▶ Dispatcher ──▶ NodeResolver (static | consul)
//!                                  │
//!                                  ▼
//!                           BreakerRegistry ──▶ Breaker(node) ──▶ BackendClient ──▶ Backend
//!                                  │ open
//!                                  ▼
//!                           HealthReconciler ──▶ HealthReporter (fail now, pass after cool-down)
//!
//!   Cross-cutting: config, observability (tracing, metrics), lifecycle, admin
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use dispatch_gateway::admin::{setup_admin_router, AdminState};
use dispatch_gateway::config::{load_config, GatewayConfig};
use dispatch_gateway::http::HttpServer;
use dispatch_gateway::lifecycle::{signals, Components, Shutdown};
use dispatch_gateway::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "dispatch-gateway", version, about = "Service dispatch gateway with per-node circuit breakers")]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    if cli.check {
        println!("configuration OK");
        return Ok(());
    }

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dispatch-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        services = config.services.len(),
        registry = ?config.registry.kind,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let components = Components::from_config(&config)?;
    let shutdown = Shutdown::new();

    if config.admin.enabled {
        let admin = setup_admin_router(AdminState {
            breakers: components.breakers.clone(),
            health: components.health.clone(),
            api_key: Arc::from(config.admin.api_key.as_str()),
        });
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");

        let mut stop = shutdown.subscribe();
        tokio::spawn(async move {
            let served = axum::serve(listener, admin)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        match signals::wait_for_signal().await {
            Ok(signal) => {
                tracing::info!(signal, "Shutdown signal received");
                signal_shutdown.trigger();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signals"),
        }
    });

    let server = HttpServer::new(&config.listener, components.dispatcher.clone());
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
