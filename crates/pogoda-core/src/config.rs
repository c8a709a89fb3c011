use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Weather provider settings
    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// City table source
    #[serde(default)]
    pub cities: CitiesConfig,

    /// Telegram bot and summary settings
    #[serde(default)]
    pub bot: BotConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for `SocketAddr` parsing.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Informers endpoint of the weather provider
    #[serde(default = "default_upstream_url")]
    pub base_url: String,

    /// Response language passed as `lang`
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Provider API key. Usually supplied via `YANDEX_API_KEY`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout; unset keeps the HTTP client default
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_upstream_url() -> String {
    "https://api.weather.yandex.ru/v2/informers".to_string()
}

fn default_lang() -> String {
    "ru_RU".to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            lang: default_lang(),
            api_key: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached coordinate pairs
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Entry time-to-live in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_capacity() -> usize {
    1000
}

fn default_ttl_secs() -> u64 {
    1800
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CitiesConfig {
    /// CSV file with `City,Latitude,Longitude` columns. Built-in table when unset.
    #[serde(default)]
    pub table_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Usually supplied via `TELEGRAM_BOT_TOKEN`.
    #[serde(default, skip_serializing)]
    pub telegram_token: Option<String>,

    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: String,

    /// The `/forecast` endpoint of a running pogoda-server
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,

    /// Long-polling timeout for `getUpdates`
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    #[serde(default)]
    pub llm: LlmConfig,
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_forecast_url() -> String {
    "http://127.0.0.1:8000/forecast".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            telegram_token: None,
            telegram_api_url: default_telegram_api_url(),
            forecast_url: default_forecast_url(),
            poll_timeout_secs: default_poll_timeout_secs(),
            llm: LlmConfig::default(),
        }
    }
}

/// Language model used for forecast summaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_url")]
    pub api_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Usually supplied via `OPENAI_API_KEY`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

fn default_llm_url() -> String {
    "https://api.openai.com/v1/completions".to_string()
}

fn default_llm_model() -> String {
    "gpt-3.5-turbo-instruct".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_llm_url(),
            model: default_llm_model(),
            max_tokens: default_max_tokens(),
            api_key: None,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the per-user config file is
    /// used when present, otherwise defaults. Environment overrides are
    /// applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.display().to_string()));
                }
                Self::from_file(path)?
            }
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged. Returns an error if validation finds critical errors.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult), ConfigError> {
        let config = Self::load(path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::NotFound(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply environment overrides using the given variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("YANDEX_API_KEY") {
            self.upstream.api_key = Some(key);
        }
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.bot.telegram_token = Some(token);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.bot.llm.api_key = Some(key);
        }
        if let Some(host) = lookup("POGODA_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("POGODA_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("POGODA_PORT is not a port: {}", port)))?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.server.port == 0 {
            result.add_error("server.port", "Port cannot be 0");
        }

        validate_url(&self.upstream.base_url, "upstream.base_url", &mut result);
        if self.upstream.api_key.as_deref().map_or(true, str::is_empty) {
            result.add_warning(
                "upstream.api_key",
                "Weather API key not set - upstream requests will be rejected",
            );
        }
        if self.upstream.timeout_secs == Some(0) {
            result.add_error("upstream.timeout_secs", "Timeout must be greater than 0");
        }

        if self.cache.capacity == 0 {
            result.add_error("cache.capacity", "Cache capacity must be greater than 0");
        }
        if self.cache.ttl_secs == 0 {
            result.add_warning("cache.ttl_secs", "Cache TTL is 0 - every request goes upstream");
        }

        if let Some(path) = &self.cities.table_path {
            if !path.is_file() {
                result.add_error(
                    "cities.table_path",
                    format!("File does not exist: {}", path.display()),
                );
            }
        }

        validate_url(&self.bot.telegram_api_url, "bot.telegram_api_url", &mut result);
        validate_url(&self.bot.forecast_url, "bot.forecast_url", &mut result);
        validate_url(&self.bot.llm.api_url, "bot.llm.api_url", &mut result);

        result
    }

    /// Path of the per-user configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pogoda").join("config.toml"))
    }
}

fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }

            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}
