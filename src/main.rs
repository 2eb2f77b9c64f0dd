//! Security gateway binary.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ listener ──▶ request id / trace / timeout layers
//!                                   │
//!                                   ▼
//!                ┌──────────────── pipeline ────────────────┐
//!                │ composer → authentication → token issuer │
//!                │        → token service → access gate     │
//!                └───────────────┬──────────────────────────┘
//!                  Terminated    │    Continue
//!           ◀──────────────────  │  ──▶ upstream ──▶ interceptors
//!                                │                       │
//!   Client ◀──── merge gateway headers ◀─────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use security_gateway::config::{load_config, GatewayConfig};
use security_gateway::lifecycle::{spawn_signal_handler, startup, Shutdown};
use security_gateway::observability::{logging, metrics};
use security_gateway::PluginRegistry;

#[derive(Parser)]
#[command(name = "security-gateway")]
#[command(about = "Authenticating reverse-proxy gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
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
    tracing::info!("security-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        config = ?args.config,
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        token_service = %config.tokens.service_uri,
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

    let bind_address = config.listener.bind_address.clone();
    let server = startup::bootstrap(config, &PluginRegistry::with_builtins())?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
