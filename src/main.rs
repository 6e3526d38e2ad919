//! Dashboard dev-server proxy.
//!
//! Fronts the single-page dashboard during development and forwards API,
//! auth and WebSocket traffic to the local backend services.
//!
//! ```text
//!     Browser ──▶ listener ──▶ RuleSet (longest prefix first)
//!                                 │
//!                 ┌───────────────┼──────────────────┐
//!                 ▼               ▼                  ▼
//!           HTTP forward    WebSocket tunnel    static fallback
//!           (+ cookie         (+ Origin           (optional)
//!            rewrite)          rewrite)
//!                 │               │
//!                 ▼               ▼
//!           primary / billing / xamops services
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use dashboard_proxy::config::{load_with_overrides, set_primary_port};
use dashboard_proxy::lifecycle::{shutdown_signal, Shutdown};
use dashboard_proxy::observability::{init_logging, init_metrics};
use dashboard_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "dashboard-proxy")]
#[command(about = "Development reverse proxy for the dashboard", long_about = None)]
struct Args {
    /// TOML config file; the built-in route table is used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port of the primary (auth) service, overriding AUTH_PORT
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    primary_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_with_overrides(args.config.as_deref())?;
    init_logging(&config.observability)?;
    if let Some(port) = args.primary_port {
        set_primary_port(&mut config, port);
    }

    tracing::info!("dashboard-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation already checked the address.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            init_metrics(addr);
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
