//! Load balancer control plane.
//!
//! Keeps HAProxy backend membership in sync with requested changes:
//! runtime API first, hash-checked file patch + validation + reload as the
//! durable fallback.
//!
//! ```text
//!     lbctl / HTTP client
//!            │
//!            ▼
//!     ┌────────────┐     ┌──────────────────────────────────────────────┐
//!     │ admin API  │────▶│            ReconciliationEngine               │
//!     │  (axum)    │     │                                               │
//!     └────────────┘     │  runtime socket ──fail──▶ store lock          │
//!            ▲           │        │                   read + patch        │
//!            │           │        ▼                   validate (-c -f)    │
//!     ┌────────────┐     │     outcome ◀───────────── write + reload      │
//!     │  registry  │────▶│        │                                      │
//!     │   sync     │     │        ▼                                      │
//!     └────────────┘     │   change log (JSON lines)                     │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use lb_reconciler::admin;
use lb_reconciler::config;
use lb_reconciler::lifecycle::{signals, startup, Shutdown};
use lb_reconciler::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "lb-reconciler")]
#[command(about = "HAProxy backend reconciliation control plane", long_about = None)]
struct Cli {
    /// Path to the TOML settings file; defaults plus environment when absent.
    #[arg(short, long, env = "LB_RECONCILER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::load_default()?,
    };

    logging::init_tracing(
        &config.observability.log_level,
        config.observability.log_format,
    );
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "lb-reconciler starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let engine = Arc::new(startup::build_engine(&config)?);

    if !config.admin.enabled {
        tracing::warn!("Admin API disabled; nothing to serve");
        return Ok(());
    }

    let state = startup::build_admin_state(&config, engine)?;
    let router = admin::setup_admin_router(
        state,
        Duration::from_secs(config.admin.request_timeout_secs),
    );

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_listener(shutdown.clone());

    let listener = TcpListener::bind(&config.admin.bind_address).await?;
    admin::serve(listener, router, shutdown.notified()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
