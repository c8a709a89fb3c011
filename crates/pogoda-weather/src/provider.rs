//! Yandex Weather informers client.

use std::time::Duration;

use async_trait::async_trait;
use pogoda_core::{NetworkError, ReqwestErrorExt, UpstreamConfig};
use reqwest::Client;
use tracing::instrument;

use crate::types::CoordinateKey;

const API_KEY_HEADER: &str = "X-Yandex-API-Key";

/// Status and body of one upstream call, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// One network call per `fetch`, no retries.
#[async_trait]
pub trait WeatherUpstream: Send + Sync {
    async fn fetch(&self, key: CoordinateKey) -> Result<UpstreamResponse, NetworkError>;
}

#[derive(Debug, Clone)]
pub struct YandexProvider {
    client: Client,
    base_url: String,
    api_key: String,
    lang: String,
}

impl YandexProvider {
    pub fn new(config: &UpstreamConfig, api_key: &str) -> Result<Self, NetworkError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(ReqwestErrorExt::into_network_error)?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: api_key.to_string(),
            lang: config.lang.clone(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl WeatherUpstream for YandexProvider {
    #[instrument(skip(self), fields(lat = key.latitude(), lon = key.longitude()), level = "debug")]
    async fn fetch(&self, key: CoordinateKey) -> Result<UpstreamResponse, NetworkError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", key.latitude().to_string()),
                ("lon", key.longitude().to_string()),
                ("lang", self.lang.clone()),
            ])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(ReqwestErrorExt::into_network_error)?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(ReqwestErrorExt::into_network_error)?
            .to_vec();

        tracing::debug!("Upstream responded {} ({} bytes)", status, body.len());
        Ok(UpstreamResponse { status, body })
    }
}
