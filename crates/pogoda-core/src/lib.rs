pub mod config;
pub mod error;

pub use config::{
    BotConfig, CacheConfig, CitiesConfig, Config, LlmConfig, ServerConfig, UpstreamConfig,
    ValidationResult,
};
pub use error::{ConfigError, NetworkError, ReqwestErrorExt};

use anyhow::Result;

/// Initialize tracing/logging for a Pogoda binary.
///
/// Honors `RUST_LOG`; falls back to `info`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::debug!("Pogoda core initialized");
    Ok(())
}
