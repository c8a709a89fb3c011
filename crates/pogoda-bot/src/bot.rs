//! Polling loop executing dialog actions against Telegram.

use std::sync::Arc;
use std::time::Duration;

use pogoda_core::BotConfig;

use crate::client::{ForecastClient, ForecastLookup};
use crate::dialog::{self, Action, Dialog, Incoming};
use crate::error::BotError;
use crate::summary::Summarizer;
use crate::telegram::{InlineKeyboard, TelegramApi};

/// Pause after a failed poll before trying again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Secrets the bot cannot start without.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub telegram_token: String,
    pub llm_key: String,
}

impl Credentials {
    pub fn from_config(config: &BotConfig) -> Result<Self, BotError> {
        let telegram_token = required(
            config.telegram_token.as_deref(),
            "bot.telegram_token (TELEGRAM_BOT_TOKEN)",
        )?;
        let llm_key = required(
            config.llm.api_key.as_deref(),
            "bot.llm.api_key (OPENAI_API_KEY)",
        )?;
        Ok(Self {
            telegram_token,
            llm_key,
        })
    }
}

fn required(value: Option<&str>, name: &str) -> Result<String, BotError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| BotError::missing_setting(name))
}

pub struct Bot {
    telegram: TelegramApi,
    forecasts: ForecastClient,
    summarizer: Arc<dyn Summarizer>,
    dialog: Dialog,
    poll_timeout_secs: u64,
    offset: i64,
}

impl Bot {
    pub fn new(
        telegram: TelegramApi,
        forecasts: ForecastClient,
        summarizer: Arc<dyn Summarizer>,
        poll_timeout_secs: u64,
    ) -> Self {
        Self {
            telegram,
            forecasts,
            summarizer,
            dialog: Dialog::new(),
            poll_timeout_secs,
            offset: 0,
        }
    }

    /// Register bot commands with Telegram.
    pub async fn register_commands(&self) -> Result<(), BotError> {
        self.telegram
            .set_my_commands(&[(dialog::START_COMMAND, dialog::START_DESCRIPTION)])
            .await?;
        Ok(())
    }

    /// Poll until ctrl-c.
    pub async fn run(&mut self) {
        tracing::info!("Bot polling for updates");
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                result = self.poll_once() => {
                    if let Err(e) = result {
                        tracing::error!("Polling failed: {}", e);
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                    }
                }
            }
        }
    }

    /// Fetch one batch of updates and handle each. Returns the batch size.
    pub async fn poll_once(&mut self) -> Result<usize, BotError> {
        let updates = self
            .telegram
            .get_updates(self.offset, self.poll_timeout_secs)
            .await?;

        for update in &updates {
            self.offset = self.offset.max(update.update_id + 1);

            let Some(incoming) = Incoming::from_update(update) else {
                tracing::debug!("Ignoring update {}", update.update_id);
                continue;
            };
            for action in self.dialog.handle(incoming) {
                if let Err(e) = self.execute(action).await {
                    tracing::error!("Failed to handle update {}: {}", update.update_id, e);
                }
            }
        }

        Ok(updates.len())
    }

    async fn execute(&self, action: Action) -> Result<(), BotError> {
        match action {
            Action::SendMenu { chat_id } => {
                let keyboard =
                    InlineKeyboard::single(dialog::FORECAST_BUTTON, dialog::FORECAST_CALLBACK);
                self.telegram
                    .send_message(chat_id, dialog::MENU_TEXT, Some(&keyboard))
                    .await?;
            }
            Action::AnswerCallback { callback_id } => {
                self.telegram.answer_callback_query(&callback_id).await?;
            }
            Action::EditText {
                chat_id,
                message_id,
                text,
            } => {
                self.telegram
                    .edit_message_text(chat_id, message_id, &text)
                    .await?;
            }
            Action::Forecast { chat_id, city } => {
                let reply = self.forecast_reply(&city).await;
                self.telegram.send_message(chat_id, &reply, None).await?;
            }
            Action::SendText { chat_id, text } => {
                self.telegram.send_message(chat_id, &text, None).await?;
            }
        }
        Ok(())
    }

    /// Text to send for a city request. Failures become the generic reply.
    pub async fn forecast_reply(&self, city: &str) -> String {
        let lookup = match self.forecasts.lookup(city).await {
            Ok(lookup) => lookup,
            Err(e) => {
                tracing::error!(
                    "Forecast request for {} failed: {} ({})",
                    city,
                    e,
                    e.user_message()
                );
                return dialog::FAILURE_TEXT.to_string();
            }
        };

        let forecast = match lookup {
            ForecastLookup::Found(forecast) => forecast,
            other => {
                return dialog::lookup_reply(city, &other)
                    .unwrap_or_else(|| dialog::FAILURE_TEXT.to_string());
            }
        };

        match self.summarizer.summarize(city, &forecast).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(
                    "Summary for {} failed: {} ({})",
                    city,
                    e,
                    e.user_message()
                );
                dialog::FAILURE_TEXT.to_string()
            }
        }
    }
}
