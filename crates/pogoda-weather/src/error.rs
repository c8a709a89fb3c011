//! Weather-specific error types.

use pogoda_core::NetworkError;
use thiserror::Error;

/// Why a payload failed the schema check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaProblem {
    /// Body was not parseable JSON
    InvalidJson(String),
    /// Required field absent or null
    Missing,
    /// Field present with the wrong primitive type
    WrongType { expected: &'static str },
}

/// Upstream payload did not match the expected shape.
///
/// `field` is a dotted path such as `forecast.parts[1].wind_dir`; the root is `$`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe(.field, .problem))]
pub struct SchemaError {
    pub field: String,
    pub problem: SchemaProblem,
}

fn describe(field: &str, problem: &SchemaProblem) -> String {
    match problem {
        SchemaProblem::InvalidJson(msg) => format!("{}: invalid JSON ({})", field, msg),
        SchemaProblem::Missing => format!("{}: field required", field),
        SchemaProblem::WrongType { expected } => {
            format!("{}: expected {}", field, expected)
        }
    }
}

impl SchemaError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            problem: SchemaProblem::Missing,
        }
    }

    pub fn wrong_type(field: impl Into<String>, expected: &'static str) -> Self {
        Self {
            field: field.into(),
            problem: SchemaProblem::WrongType { expected },
        }
    }
}

/// Failure of a weather request.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("Upstream returned status {status}")]
    Upstream { status: u16 },

    #[error("Schema mismatch: {0}")]
    Schema(#[from] SchemaError),

    #[error("Transport error: {0}")]
    Transport(#[from] NetworkError),
}

impl WeatherError {
    /// HTTP status the failure maps to.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::CityNotFound(_) => 422,
            Self::Upstream { .. } => 500,
            Self::Schema(_) => 400,
            Self::Transport(_) => 500,
        }
    }

    /// Human-readable detail for error bodies.
    pub fn detail(&self) -> String {
        match self {
            Self::CityNotFound(_) => "City not found".to_string(),
            Self::Upstream { .. } => "Error getting weather data".to_string(),
            Self::Schema(err) => err.to_string(),
            Self::Transport(_) => "Internal server error".to_string(),
        }
    }
}
