//! Edge gateway binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                 EDGE GATEWAY                  │
//!  Client Request    │  ┌──────────┐   ┌────────────┐   ┌─────────┐ │
//!  ──────────────────┼─▶│ resolver │──▶│ resolution │──▶│ routing │ │
//!                    │  │  (host)  │   │   cache    │   │(version)│ │
//!                    │  └──────────┘   └────────────┘   └────┬────┘ │
//!                    │                                       ▼      │
//!                    │  ┌──────────┐   ┌────────────┐   ┌─────────┐ │
//!  Client Response   │  │ recorder │◀──│  response  │◀──│ render  │◀┼── Upstream
//!  ◀─────────────────┼──│ (observe)│   │   cache    │   │(forward)│ │
//!                    │  └──────────┘   └────────────┘   └─────────┘ │
//!                    │  ┌──────────────────────────────────────────┐│
//!                    │  │ config · directory · observability ·     ││
//!                    │  │ lifecycle · key-value store (mem/redis)  ││
//!                    │  └──────────────────────────────────────────┘│
//!                    └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edge_gateway::cache::store::build_store;
use edge_gateway::config::loader::load_config;
use edge_gateway::config::EdgeConfig;
use edge_gateway::directory::file::WatchedDirectory;
use edge_gateway::directory::{InMemoryDirectory, TenantDirectory, VersionDirectory};
use edge_gateway::http::EdgeServer;
use edge_gateway::observability::metrics;
use edge_gateway::render::UpstreamRenderer;

#[derive(Debug, Parser)]
#[command(name = "edge-gateway", about = "Multi-tenant edge resolution and caching gateway")]
struct Args {
    /// Path to the configuration file (TOML). Defaults apply if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edge_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("edge-gateway v0.1.0 starting");

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => EdgeConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_domain = %config.platform.base_domain,
        default_environment = %config.platform.default_environment,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    let store = build_store(&config.store).await?;

    // The tenant directory doubles as the version directory; keep the
    // fixture watcher alive for the life of the process.
    let mut _fixture_watcher = None;
    let (tenants, versions): (Arc<dyn TenantDirectory>, Arc<dyn VersionDirectory>) =
        match &config.tenants.file {
            Some(path) => {
                let directory = WatchedDirectory::open(std::path::Path::new(path))?;
                if config.tenants.watch {
                    _fixture_watcher = Some(directory.clone().watch()?);
                }
                (directory.clone(), directory)
            }
            None => {
                tracing::warn!("No tenant fixture configured; every lookup will miss");
                let directory = Arc::new(InMemoryDirectory::new());
                (directory.clone(), directory)
            }
        };

    let renderer = Arc::new(UpstreamRenderer::new());

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = EdgeServer::new(config, tenants, versions, store, renderer);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
