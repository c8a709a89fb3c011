//! Endpoint tests for the HTTP surface.
//!
//! Most tests run the real Yandex client against a wiremock server. Cache
//! expiry is driven through a counting fake upstream and a manual clock.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pogoda_core::{Config, NetworkError};
use pogoda_server::{build_service, routes, ErrorBody};
use pogoda_weather::{
    CityTable, CoordinateKey, ManualClock, TtlCache, UpstreamResponse, WeatherService,
    WeatherUpstream,
};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_payload() -> Value {
    json!({
        "now": 1699430000,
        "fact": {"temp": 20.0, "pressure_mm": 750.0, "wind_speed": 5.0, "condition": "clear"},
        "forecast": {
            "date": "2023-11-08",
            "date_ts": 1667894400,
            "week": 45,
            "sunrise": "07:12",
            "sunset": "16:38",
            "moon_code": 3,
            "moon_text": "Waning crescent",
            "parts": [
                {
                    "part_name": "evening",
                    "temp_min": 15.0,
                    "temp_max": 21.0,
                    "temp_avg": 18.0,
                    "feels_like": 16.0,
                    "icon": "bkn_n",
                    "condition": "cloudy",
                    "daytime": "n",
                    "polar": false,
                    "wind_speed": 3.0,
                    "wind_gust": 7.0,
                    "wind_dir": "nw",
                    "pressure_mm": 745.0,
                    "pressure_pa": 993.0,
                    "humidity": 60.0,
                    "prec_mm": 0.0,
                    "prec_period": 3.0,
                    "prec_prob": 20.0
                }
            ]
        }
    })
}

fn service_for(base_url: &str) -> Arc<WeatherService> {
    let mut config = Config::default();
    config.upstream.base_url = base_url.to_string();
    config.upstream.api_key = Some("test_key".to_string());
    Arc::new(build_service(&config).unwrap())
}

async fn get(service: &Arc<WeatherService>, uri: &str) -> (u16, Value) {
    let response = warp::test::request()
        .method("GET")
        .path(uri)
        .reply(&routes(service.clone()))
        .await;
    let body = serde_json::from_slice(response.body()).unwrap();
    (response.status().as_u16(), body)
}

fn detail(body: Value) -> String {
    serde_json::from_value::<ErrorBody>(body).unwrap().detail
}

#[tokio::test]
async fn test_weather_fetches_once_then_serves_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/informers"))
        .and(query_param("lat", "55.75"))
        .and(query_param("lon", "37.62"))
        .and(header("X-Yandex-API-Key", "test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_payload()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&format!("{}/v2/informers", mock_server.uri()));

    let (status, first) = get(&service, "/weather?city=Moscow").await;
    assert_eq!(status, 200);
    assert_eq!(first, json!({"temp": 20.0, "pressure_mm": 750.0, "wind_speed": 5.0}));

    let (status, second) = get(&service, "/weather?city=Moscow").await;
    assert_eq!(status, 200);
    assert_eq!(first, second);
    // `expect(1)` is verified when the mock server drops
}

#[tokio::test]
async fn test_forecast_returns_upstream_object_untouched() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_payload()))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri());
    let (status, body) = get(&service, "/forecast?city=moscow").await;

    assert_eq!(status, 200);
    assert_eq!(body, mock_payload()["forecast"]);
}

#[tokio::test]
async fn test_weather_and_forecast_share_cache_entry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_payload()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri());
    assert_eq!(get(&service, "/weather?city=Kazan").await.0, 200);
    assert_eq!(get(&service, "/forecast?city=Kazan").await.0, 200);
}

#[tokio::test]
async fn test_unknown_city_is_422() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_payload()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri());
    let (status, body) = get(&service, "/weather?city=Atlantis").await;

    assert_eq!(status, 422);
    assert_eq!(detail(body), "City not found");
}

#[tokio::test]
async fn test_upstream_error_is_500_and_not_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri());

    for _ in 0..2 {
        let (status, body) = get(&service, "/weather?city=Moscow").await;
        assert_eq!(status, 500);
        assert_eq!(body, json!({"detail": "Error getting weather data"}));
    }
    assert!(service.cache().is_empty());
}

#[tokio::test]
async fn test_empty_upstream_object_is_400() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri());
    let (status, body) = get(&service, "/forecast?city=Moscow").await;

    assert_eq!(status, 400);
    assert_eq!(detail(body), "fact: field required");
    assert!(service.cache().is_empty());
}

#[tokio::test]
async fn test_missing_field_names_path() {
    let mock_server = MockServer::start().await;

    let mut payload = mock_payload();
    payload["forecast"]["parts"][0]
        .as_object_mut()
        .unwrap()
        .remove("wind_dir");

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri());
    let (status, body) = get(&service, "/weather?city=Moscow").await;

    assert_eq!(status, 400);
    assert_eq!(detail(body), "forecast.parts[0].wind_dir: field required");
}

#[tokio::test]
async fn test_transport_failure_is_500() {
    // Nothing listens on the discard port
    let service = service_for("http://127.0.0.1:9/v2/informers");
    let (status, body) = get(&service, "/weather?city=Moscow").await;

    assert_eq!(status, 500);
    assert_eq!(detail(body), "Internal server error");
}

#[tokio::test]
async fn test_missing_city_parameter() {
    let service = service_for("http://127.0.0.1:9");

    let (status, body) = get(&service, "/weather").await;
    assert_eq!(status, 422);
    assert_eq!(detail(body), pogoda_server::MISSING_CITY);

    let (status, _) = get(&service, "/forecast?town=Moscow").await;
    assert_eq!(status, 422);
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let service = service_for("http://127.0.0.1:9");
    let (status, body) = get(&service, "/climate?city=Moscow").await;

    assert_eq!(status, 404);
    assert_eq!(detail(body), "Not found");
}

#[tokio::test]
async fn test_post_is_405() {
    let service = service_for("http://127.0.0.1:9");
    let response = warp::test::request()
        .method("POST")
        .path("/weather?city=Moscow")
        .reply(&routes(service))
        .await;

    assert_eq!(response.status().as_u16(), 405);
}

#[tokio::test]
async fn test_csv_city_table() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("lat", "1"))
        .and(query_param("lon", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_payload()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "City,Latitude,Longitude").unwrap();
    writeln!(file, "testcity,1.0,2.0").unwrap();

    let mut config = Config::default();
    config.upstream.base_url = mock_server.uri();
    config.upstream.api_key = Some("test_key".to_string());
    config.cities.table_path = Some(file.path().to_path_buf());
    let service = Arc::new(build_service(&config).unwrap());

    let (status, _) = get(&service, "/weather?city=testcity").await;
    assert_eq!(status, 200);

    // Built-in names are not loaded alongside a CSV table
    let (status, _) = get(&service, "/weather?city=Moscow").await;
    assert_eq!(status, 422);
}

#[test]
fn test_missing_api_key_is_rejected() {
    let config = Config::default();
    let err = build_service(&config).err().unwrap();
    assert!(err.to_string().contains("api_key"));
}

/// Always returns the mock payload and counts calls.
struct CountingUpstream {
    calls: AtomicUsize,
}

#[async_trait]
impl WeatherUpstream for CountingUpstream {
    async fn fetch(&self, _key: CoordinateKey) -> Result<UpstreamResponse, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(UpstreamResponse {
            status: 200,
            body: serde_json::to_vec(&mock_payload()).unwrap(),
        })
    }
}

#[tokio::test]
async fn test_cache_expiry_through_endpoint() {
    let upstream = Arc::new(CountingUpstream {
        calls: AtomicUsize::new(0),
    });
    let clock = ManualClock::new();
    let cache = TtlCache::with_clock(10, Duration::from_secs(1800), Arc::new(clock.clone()));
    let service = Arc::new(WeatherService::new(
        Arc::new(CityTable::builtin()),
        upstream.clone(),
        cache,
    ));

    assert_eq!(get(&service, "/weather?city=Moscow").await.0, 200);
    clock.advance(Duration::from_secs(1799));
    assert_eq!(get(&service, "/forecast?city=MOSCOW").await.0, 200);
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);

    clock.advance(Duration::from_secs(1));
    assert_eq!(get(&service, "/weather?city=Moscow").await.0, 200);
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
}
