//! Bot error types.

use pogoda_core::{ConfigError, NetworkError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Telegram API error in {method}: {description}")]
    Telegram { method: String, description: String },

    #[error("Summary failed: {0}")]
    Summary(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BotError {
    pub fn user_message(&self) -> &'static str {
        match self {
            BotError::Network(e) => e.user_message(),
            BotError::Telegram { .. } => "Telegram rejected the request.",
            BotError::Summary(_) => "Could not summarize the forecast.",
            BotError::Config(e) => e.user_message(),
        }
    }

    pub fn missing_setting(name: &str) -> Self {
        Self::Config(ConfigError::MissingSetting(name.to_string()))
    }

    pub fn telegram(method: &str, description: impl Into<String>) -> Self {
        Self::Telegram {
            method: method.to_string(),
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_user_message() {
        let err = BotError::telegram("sendMessage", "Forbidden");
        assert_eq!(err.to_string(), "Telegram API error in sendMessage: Forbidden");
        assert!(!err.user_message().is_empty());

        let err = BotError::from(NetworkError::Timeout);
        assert_eq!(err.user_message(), NetworkError::Timeout.user_message());
    }

    #[test]
    fn test_missing_setting_is_config_error() {
        let err = BotError::missing_setting("bot.telegram_token");
        assert_eq!(err.to_string(), "Missing required setting: bot.telegram_token");
        assert_eq!(
            err.user_message(),
            ConfigError::MissingSetting(String::new()).user_message()
        );
    }
}
