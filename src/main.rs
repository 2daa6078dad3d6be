//! Edge gateway binary.
//!
//! ```text
//! .env → CLI → config (defaults, TOML, environment) → logging → metrics
//!      → route set → persistence readiness → bind → serve → drain
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use edge_gateway::config::load_config;
use edge_gateway::handlers::standard_bindings;
use edge_gateway::lifecycle::{launch, persistence_from_config, Shutdown};
use edge_gateway::observability::{logging, metrics};
use edge_gateway::session::MemoryStore;
use edge_gateway::Gateway;

#[derive(Parser)]
#[command(name = "edge-gateway", version, about = "Edge gateway for the application and its API")]
struct Cli {
    /// Optional TOML configuration file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    logging::init_logging(&config.observability, config.environment);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        address = %config.listener.bind_address(),
        public_dir = %config.static_files.public_dir.display(),
        "edge-gateway starting"
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

    let persistence = persistence_from_config(&config.database)?;

    let sessions = Arc::new(MemoryStore::new());
    tokio::spawn(purge_sessions(sessions.clone()));

    let mut builder = Gateway::builder(config).session_store(sessions);
    for binding in standard_bindings() {
        builder = builder.route(binding);
    }
    let gateway = builder.build()?;

    let shutdown = Shutdown::new();
    if let Err(e) = launch(gateway, persistence.as_ref(), &shutdown).await {
        tracing::error!(error = %e, "Gateway failed");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Expired sessions are also evicted on read; this bounds memory for
/// sessions that are never presented again.
async fn purge_sessions(store: Arc<MemoryStore>) {
    let mut interval = tokio::time::interval(Duration::from_secs(600));
    loop {
        interval.tick().await;
        let purged = store.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, remaining = store.len(), "Purged expired sessions");
        }
    }
}
