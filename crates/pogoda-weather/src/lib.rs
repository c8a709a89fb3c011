//! Weather data for Pogoda
//!
//! Resolves city names to coordinates, fetches conditions from the Yandex
//! Weather API, validates the payload and keeps it in a TTL cache.

pub mod cache;
pub mod error;
pub mod provider;
pub mod resolver;
pub mod service;
pub mod types;
pub mod validate;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache, WeatherCache};
pub use error::{SchemaError, SchemaProblem, WeatherError};
pub use provider::{UpstreamResponse, WeatherUpstream, YandexProvider};
pub use resolver::{CityTable, CityTableError, CoordinateResolver};
pub use service::WeatherService;
pub use types::*;
pub use validate::{validate, validate_forecast, validate_value};
