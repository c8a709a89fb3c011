//! HTTP surface for Pogoda
//!
//! `GET /weather?city=` returns current conditions, `GET /forecast?city=`
//! the upstream forecast object. Errors are `{"detail": "..."}` bodies.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pogoda_core::{Config, ConfigError};
use pogoda_weather::{CityTable, WeatherCache, WeatherError, WeatherService, YandexProvider};
use serde::{Deserialize, Serialize};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

pub const MISSING_CITY: &str = "Missing or invalid query parameter: city";

#[derive(Debug, Deserialize)]
pub struct CityQuery {
    pub city: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Build the weather service from configuration.
pub fn build_service(config: &Config) -> anyhow::Result<WeatherService> {
    let api_key = config
        .upstream
        .api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingSetting("upstream.api_key (YANDEX_API_KEY)".into()))?;

    let cities = CityTable::load(config.cities.table_path.as_deref())
        .context("Failed to load city table")?;
    tracing::info!("City table ready with {} names", cities.len());

    let provider = YandexProvider::new(&config.upstream, api_key)?;
    let cache = WeatherCache::new(
        config.cache.capacity,
        Duration::from_secs(config.cache.ttl_secs),
    );

    Ok(WeatherService::new(Arc::new(cities), Arc::new(provider), cache))
}

/// All routes with rejection handling applied.
pub fn routes(
    service: Arc<WeatherService>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let weather_route = warp::path("weather")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<CityQuery>())
        .and(with_service(service.clone()))
        .and_then(current_weather);

    let forecast_route = warp::path("forecast")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<CityQuery>())
        .and(with_service(service))
        .and_then(forecast);

    weather_route
        .or(forecast_route)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

fn with_service(
    service: Arc<WeatherService>,
) -> impl Filter<Extract = (Arc<WeatherService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

pub async fn current_weather(
    query: CityQuery,
    service: Arc<WeatherService>,
) -> Result<impl Reply, Rejection> {
    service
        .current(&query.city)
        .await
        .map(|current| warp::reply::json(&current))
        .map_err(|e| warp::reject::custom(ApiError(e)))
}

pub async fn forecast(
    query: CityQuery,
    service: Arc<WeatherService>,
) -> Result<impl Reply, Rejection> {
    service
        .forecast(&query.city)
        .await
        .map(|forecast| warp::reply::json(&forecast))
        .map_err(|e| warp::reject::custom(ApiError(e)))
}

#[derive(Debug)]
struct ApiError(WeatherError);
impl warp::reject::Reject for ApiError {}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, detail) = if let Some(ApiError(e)) = err.find::<ApiError>() {
        match e {
            WeatherError::Transport(_) => tracing::error!("Request failed: {}", e),
            WeatherError::Upstream { .. } | WeatherError::Schema(_) => {
                tracing::warn!("Request failed: {}", e)
            }
            WeatherError::CityNotFound(_) => tracing::debug!("{}", e),
        }
        let code = StatusCode::from_u16(e.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (code, e.detail())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::UNPROCESSABLE_ENTITY, MISSING_CITY.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        tracing::error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    let json = warp::reply::json(&ErrorBody { detail });
    Ok(warp::reply::with_status(json, code))
}
