use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use pogoda_bot::{Bot, Credentials, ForecastClient, OpenAiSummarizer, TelegramApi};
use pogoda_core::Config;

#[derive(Debug, Parser)]
#[command(about = "Pogoda Telegram bot.")]
struct Cli {
    /// Configuration file (defaults to the per-user config)
    #[arg(env = "POGODA_CONFIG", short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    pogoda_core::init()?;

    let args = Cli::parse();
    let (config, _) = Config::load_validated(args.config.as_deref())
        .inspect_err(|e| tracing::error!("{}", e.user_message()))?;
    let bot_config = &config.bot;

    let credentials = Credentials::from_config(bot_config)
        .inspect_err(|e| tracing::error!("{}", e.user_message()))?;

    let telegram = TelegramApi::new(&bot_config.telegram_api_url, &credentials.telegram_token);
    let forecasts = ForecastClient::new(&bot_config.forecast_url);
    let summarizer = Arc::new(OpenAiSummarizer::new(&bot_config.llm, &credentials.llm_key));

    let mut bot = Bot::new(telegram, forecasts, summarizer, bot_config.poll_timeout_secs);
    if let Err(e) = bot.register_commands().await {
        tracing::warn!("Failed to register commands: {}", e);
    }

    tracing::info!("Using forecast endpoint {}", bot_config.forecast_url);
    bot.run().await;
    tracing::info!("Bot stopped");

    Ok(())
}
