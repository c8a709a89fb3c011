//! Request orchestration: resolve, look up, fetch, validate, store.

use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;

use crate::cache::WeatherCache;
use crate::error::WeatherError;
use crate::provider::WeatherUpstream;
use crate::resolver::CoordinateResolver;
use crate::types::{CurrentConditions, WeatherPayload};
use crate::validate::validate;

/// Weather lookups by city name, backed by a shared cache.
///
/// Only payloads that passed validation are stored. Failed fetches leave
/// the cache untouched.
pub struct WeatherService {
    resolver: Arc<dyn CoordinateResolver>,
    upstream: Arc<dyn WeatherUpstream>,
    cache: WeatherCache,
}

impl WeatherService {
    pub fn new(
        resolver: Arc<dyn CoordinateResolver>,
        upstream: Arc<dyn WeatherUpstream>,
        cache: WeatherCache,
    ) -> Self {
        Self {
            resolver,
            upstream,
            cache,
        }
    }

    /// `fact.temp`, `fact.pressure_mm` and `fact.wind_speed` for `city`.
    pub async fn current(&self, city: &str) -> Result<CurrentConditions, WeatherError> {
        Ok(self.payload(city).await?.current())
    }

    /// The upstream `forecast` object for `city`, as received.
    pub async fn forecast(&self, city: &str) -> Result<Value, WeatherError> {
        Ok(self.payload(city).await?.raw_forecast().clone())
    }

    /// Validated payload for `city`, from cache when fresh.
    #[instrument(skip(self), level = "debug")]
    pub async fn payload(&self, city: &str) -> Result<Arc<WeatherPayload>, WeatherError> {
        let key = self
            .resolver
            .resolve(city)
            .ok_or_else(|| WeatherError::CityNotFound(city.trim().to_string()))?;

        if let Some(payload) = self.cache.get(&key) {
            tracing::debug!("Cache hit for {} at {}", city, key);
            return Ok(payload);
        }

        tracing::info!("Cache miss for {}, fetching from upstream", city);

        let response = self.upstream.fetch(key).await.map_err(|e| {
            tracing::error!("Upstream request for {} failed: {}", city, e);
            WeatherError::Transport(e)
        })?;

        if !response.is_success() {
            tracing::warn!("Upstream returned status {} for {}", response.status, city);
            return Err(WeatherError::Upstream {
                status: response.status,
            });
        }

        let payload = validate(&response.body).map_err(|e| {
            tracing::warn!("Upstream payload for {} rejected: {}", city, e);
            WeatherError::Schema(e)
        })?;

        let payload = Arc::new(payload);
        self.cache.put(key, payload.clone());
        Ok(payload)
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, TtlCache};
    use crate::provider::UpstreamResponse;
    use crate::resolver::CityTable;
    use crate::types::CoordinateKey;
    use crate::validate::tests::sample_payload;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pogoda_core::NetworkError;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Replays queued responses and counts calls.
    #[derive(Default)]
    struct FakeUpstream {
        responses: Mutex<VecDeque<Result<UpstreamResponse, NetworkError>>>,
        calls: Mutex<Vec<CoordinateKey>>,
    }

    impl FakeUpstream {
        fn push_ok(&self, status: u16, body: Value) {
            self.responses.lock().push_back(Ok(UpstreamResponse {
                status,
                body: serde_json::to_vec(&body).unwrap(),
            }));
        }

        fn push_err(&self, err: NetworkError) {
            self.responses.lock().push_back(Err(err));
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl WeatherUpstream for FakeUpstream {
        async fn fetch(&self, key: CoordinateKey) -> Result<UpstreamResponse, NetworkError> {
            self.calls.lock().push(key);
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(NetworkError::ConnectionFailed("no response queued".into())))
        }
    }

    fn service_with(upstream: Arc<FakeUpstream>) -> (WeatherService, ManualClock) {
        let clock = ManualClock::new();
        let table = CityTable::from_csv_str("City,Latitude,Longitude\ntestcity,1.0,2.0\n").unwrap();
        let cache = TtlCache::with_clock(10, Duration::from_secs(1800), Arc::new(clock.clone()));
        (WeatherService::new(Arc::new(table), upstream, cache), clock)
    }

    #[tokio::test]
    async fn test_current_projects_fact() {
        let upstream = Arc::new(FakeUpstream::default());
        upstream.push_ok(200, sample_payload());
        let (service, _clock) = service_with(upstream.clone());

        let current = service.current("testcity").await.unwrap();
        assert_eq!(
            current,
            CurrentConditions {
                temp: 20.0,
                pressure_mm: 750.0,
                wind_speed: 5.0,
            }
        );
        assert_eq!(upstream.calls.lock()[0], CoordinateKey::new(1.0, 2.0));
    }

    #[tokio::test]
    async fn test_forecast_is_verbatim() {
        let upstream = Arc::new(FakeUpstream::default());
        upstream.push_ok(200, sample_payload());
        let (service, _clock) = service_with(upstream);

        let forecast = service.forecast("testcity").await.unwrap();
        assert_eq!(forecast, sample_payload()["forecast"]);
    }

    #[tokio::test]
    async fn test_second_request_served_from_cache() {
        let upstream = Arc::new(FakeUpstream::default());
        upstream.push_ok(200, sample_payload());
        let (service, _clock) = service_with(upstream.clone());

        service.current("testcity").await.unwrap();
        service.forecast("TestCity").await.unwrap();

        assert_eq!(upstream.call_count(), 1);
        assert_eq!(service.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_refetched() {
        let upstream = Arc::new(FakeUpstream::default());
        upstream.push_ok(200, sample_payload());
        upstream.push_ok(200, sample_payload());
        let (service, clock) = service_with(upstream.clone());

        service.current("testcity").await.unwrap();
        clock.advance(Duration::from_secs(1801));
        service.current("testcity").await.unwrap();

        assert_eq!(upstream.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_city_skips_upstream() {
        let upstream = Arc::new(FakeUpstream::default());
        let (service, _clock) = service_with(upstream.clone());

        let err = service.current("Atlantis").await.unwrap_err();
        assert!(matches!(err, WeatherError::CityNotFound(ref c) if c == "Atlantis"));
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_non_200_not_cached() {
        let upstream = Arc::new(FakeUpstream::default());
        upstream.push_ok(503, serde_json::json!({"error": "unavailable"}));
        upstream.push_ok(200, sample_payload());
        let (service, _clock) = service_with(upstream.clone());

        let err = service.current("testcity").await.unwrap_err();
        assert!(matches!(err, WeatherError::Upstream { status: 503 }));
        assert!(service.cache().is_empty());

        // The next request goes upstream again
        service.current("testcity").await.unwrap();
        assert_eq!(upstream.call_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_payload_not_cached() {
        let upstream = Arc::new(FakeUpstream::default());
        let mut payload = sample_payload();
        payload["fact"]
            .as_object_mut()
            .unwrap()
            .remove("temp");
        upstream.push_ok(200, payload);
        let (service, _clock) = service_with(upstream);

        let err = service.current("testcity").await.unwrap_err();
        match err {
            WeatherError::Schema(schema) => assert_eq!(schema.field, "fact.temp"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_not_cached() {
        let upstream = Arc::new(FakeUpstream::default());
        upstream.push_err(NetworkError::Timeout);
        let (service, _clock) = service_with(upstream);

        let err = service.forecast("testcity").await.unwrap_err();
        assert!(matches!(err, WeatherError::Transport(NetworkError::Timeout)));
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_stale_entry_not_served_after_failed_refresh() {
        let upstream = Arc::new(FakeUpstream::default());
        upstream.push_ok(200, sample_payload());
        upstream.push_ok(500, serde_json::json!({}));
        let (service, clock) = service_with(upstream);

        service.current("testcity").await.unwrap();
        clock.advance(Duration::from_secs(1800));

        let err = service.current("testcity").await.unwrap_err();
        assert!(matches!(err, WeatherError::Upstream { status: 500 }));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_cache() {
        let upstream = Arc::new(FakeUpstream::default());
        for _ in 0..8 {
            upstream.push_ok(200, sample_payload());
        }
        let (service, _clock) = service_with(upstream.clone());
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.current("testcity").await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().temp, 20.0);
        }

        // Concurrent misses may each fetch, but only one entry is kept
        assert!(upstream.call_count() >= 1);
        assert_eq!(service.cache().len(), 1);
    }
}
