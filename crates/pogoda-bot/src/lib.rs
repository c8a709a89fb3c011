//! Telegram bot for Pogoda
//!
//! Asks the user for a city, fetches the forecast from the Pogoda proxy and
//! replies with a language-model summary.

pub mod bot;
pub mod client;
pub mod dialog;
pub mod error;
pub mod summary;
pub mod telegram;

pub use bot::{Bot, Credentials};
pub use client::{ForecastClient, ForecastLookup};
pub use dialog::{Action, Dialog, Incoming};
pub use error::BotError;
pub use summary::{OpenAiSummarizer, Summarizer};
pub use telegram::TelegramApi;
