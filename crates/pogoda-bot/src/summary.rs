//! Natural-language forecast summaries.

use async_trait::async_trait;
use pogoda_core::{LlmConfig, ReqwestErrorExt};
use pogoda_weather::Forecast;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::BotError;

/// Turns a forecast into a chat-ready message.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, city: &str, forecast: &Forecast) -> Result<String, BotError>;
}

/// Prompt asking for a short, cheerful forecast for today.
pub fn build_prompt(city: &str, forecast: &Forecast) -> Result<String, BotError> {
    let data = serde_json::to_string(forecast).map_err(|e| BotError::Summary(e.to_string()))?;
    Ok(format!(
        "Ассистент - это большая языковая модель, которая помогает людям.\n\n\
         Человек: Используя ниже указанные данные для города {city}, напиши краткий прогноз \
         погоды на сегодняшний день. Будь по веселее и используй эмодзи.\n\
         \"\"\"\n{data}\n\"\"\"\n\
         Ассистент:"
    ))
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

/// OpenAI completions API summarizer.
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiSummarizer {
    pub fn new(config: &LlmConfig, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    #[instrument(skip(self, forecast), level = "info")]
    async fn summarize(&self, city: &str, forecast: &Forecast) -> Result<String, BotError> {
        let prompt = build_prompt(city, forecast)?;
        let request = CompletionRequest {
            model: &self.model,
            prompt: &prompt,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(ReqwestErrorExt::into_network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Summary(format!("HTTP {}: {}", status, body)));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| BotError::Summary(format!("Malformed completion: {}", e)))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| BotError::Summary("Completion has no text".to_string()))?;

        tracing::debug!("Summary for {} is {} chars", city, text.chars().count());
        Ok(text)
    }
}
