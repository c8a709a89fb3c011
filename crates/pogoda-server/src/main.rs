use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pogoda_core::Config;

#[derive(Debug, Parser)]
#[command(about = "Pogoda weather proxy.")]
struct Cli {
    /// Configuration file (defaults to the per-user config)
    #[arg(env = "POGODA_CONFIG", short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides `server.host` and `server.port`
    #[arg(env = "POGODA_ADDRESS", short, long)]
    address: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    pogoda_core::init()?;

    let args = Cli::parse();
    let (config, _) = Config::load_validated(args.config.as_deref())
        .inspect_err(|e| tracing::error!("{}", e.user_message()))?;

    let address = match args.address {
        Some(address) => address,
        None => config
            .server
            .address()
            .parse()
            .with_context(|| format!("Invalid listen address {}", config.server.address()))?,
    };

    let service = Arc::new(pogoda_server::build_service(&config)?);
    tracing::info!(
        "Cache holds up to {} entries for {}s",
        service.cache().capacity(),
        service.cache().ttl().as_secs()
    );

    let (bound, server) = warp::serve(pogoda_server::routes(service))
        .try_bind_with_graceful_shutdown(address, async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown requested");
        })
        .with_context(|| format!("Failed to bind {}", address))?;

    tracing::info!("Pogoda listening on http://{}", bound);
    server.await;
    tracing::info!("Pogoda stopped");

    Ok(())
}
