//! Client for the proxy's `/forecast` endpoint.

use pogoda_core::{NetworkError, ReqwestErrorExt};
use pogoda_weather::{validate_forecast, Forecast};
use serde_json::Value;
use tracing::instrument;

/// Outcome of a forecast lookup that reached the proxy.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastLookup {
    Found(Forecast),
    /// Proxy answered 422
    UnknownCity,
    /// Any other status, or a body that is not a valid forecast
    Failed,
}

#[derive(Debug, Clone)]
pub struct ForecastClient {
    client: reqwest::Client,
    url: String,
}

impl ForecastClient {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }

    #[instrument(skip(self), level = "info")]
    pub async fn lookup(&self, city: &str) -> Result<ForecastLookup, NetworkError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("city", city)])
            .send()
            .await
            .map_err(ReqwestErrorExt::into_network_error)?;

        match response.status().as_u16() {
            200 => {
                let body: Value = match response.json().await {
                    Ok(body) => body,
                    Err(e) => {
                        tracing::warn!("Forecast body is not JSON: {}", e);
                        return Ok(ForecastLookup::Failed);
                    }
                };
                match validate_forecast(&body) {
                    Ok(forecast) => Ok(ForecastLookup::Found(forecast)),
                    Err(e) => {
                        tracing::warn!("Forecast body rejected: {}", e);
                        Ok(ForecastLookup::Failed)
                    }
                }
            }
            422 => Ok(ForecastLookup::UnknownCity),
            status => {
                tracing::warn!("Forecast endpoint returned status {}", status);
                Ok(ForecastLookup::Failed)
            }
        }
    }
}
