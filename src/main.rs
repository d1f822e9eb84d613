//! Gateway node sync daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!                ┌──────────────────────────────────────────────────────┐
//!                │                     GATEWAY NODE                      │
//!                │                                                       │
//!   management   │  ┌────────────┐   register / deregister               │
//!   plane  ◀─────┼──│ management │◀──────────────────┐                   │
//!   (HTTPS+mTLS) │  │   client   │   fetch configs   │                   │
//!                │  └─────┬──────┘                   │                   │
//!                │        │                   ┌──────┴──────┐            │
//!                │        ▼                   │  lifecycle  │            │
//!                │  ┌────────────┐            └─────────────┘            │
//!                │  │   reload   │──swap──▶ ┌──────────────┐             │
//!                │  │ coalescer  │          │ config store │◀── readers  │
//!                │  └─────▲──────┘          └──────────────┘             │
//!                │        │ trigger                                      │
//!   change       │  ┌─────┴──────┐                                       │
//!   channel ─────┼─▶│ listener   │                                       │
//!                │  └────────────┘                                       │
//!                └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use gateway_sync::config::{load_config, GatewayConfig};
use gateway_sync::lifecycle::{startup, wait_for_signal, GatewaySync};
use gateway_sync::net::tls::install_crypto_provider;
use gateway_sync::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "gateway-sync")]
#[command(about = "Keeps a gateway node in sync with its management plane", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(default_value = "gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        load_config(&cli.config)?
    } else {
        GatewayConfig::default()
    };

    logging::init_logging(&config.observability);
    install_crypto_provider();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), config = %cli.config.display(), "gateway-sync starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    if !config.management.use_management_plane {
        tracing::warn!("Management plane disabled, nothing to synchronize");
        return Ok(());
    }

    let certs = startup::load_certificates(&config)?;
    let source = startup::notification_source(&config.notifications)?;
    let sync = GatewaySync::start(&config, certs, source).await?;

    tracing::info!(
        node_id = ?sync.registrar.node_id(),
        entries = sync.store.len(),
        "Node synchronized"
    );

    wait_for_signal().await;

    if let Err(e) = sync.stop().await {
        tracing::error!(error = %e, "Deregistration failed");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
