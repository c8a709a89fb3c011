use serde::Serialize;
use serde_json::Value;

/// Scale of the quantized coordinate grid (1e-6 degrees, roughly 11 cm).
const MICRODEGREES: f64 = 1_000_000.0;

/// Cache and upstream key for a location.
///
/// Coordinates are quantized to micro-degrees so two readings of the same
/// table row always hash and compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinateKey {
    lat_e6: i64,
    lon_e6: i64,
}

impl CoordinateKey {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            lat_e6: (latitude * MICRODEGREES).round() as i64,
            lon_e6: (longitude * MICRODEGREES).round() as i64,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.lat_e6 as f64 / MICRODEGREES
    }

    pub fn longitude(&self) -> f64 {
        self.lon_e6 as f64 / MICRODEGREES
    }
}

impl std::fmt::Display for CoordinateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude(), self.longitude())
    }
}

/// Observed conditions (`fact` section)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fact {
    pub temp: f64,
    pub pressure_mm: f64,
    pub wind_speed: f64,
}

/// One part of the day in the forecast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Part {
    pub part_name: String,
    pub temp_min: f64,
    pub temp_max: f64,
    pub temp_avg: f64,
    pub feels_like: f64,
    pub icon: String,
    pub condition: String,
    pub daytime: String,
    pub polar: Option<bool>,
    pub wind_speed: f64,
    pub wind_gust: f64,
    pub wind_dir: String,
    pub pressure_mm: f64,
    pub pressure_pa: f64,
    pub humidity: f64,
    pub prec_mm: f64,
    pub prec_period: f64,
    pub prec_prob: f64,
}

/// Forecast section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub date: String,
    pub date_ts: i64,
    pub week: i64,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub moon_code: i64,
    pub moon_text: String,
    pub parts: Vec<Part>,
}

/// A validated upstream response.
///
/// Only the validator builds these, so every instance has passed the
/// schema check. The upstream `forecast` object is kept alongside the typed
/// view so it can be served back byte-for-byte equivalent.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherPayload {
    pub fact: Fact,
    pub forecast: Forecast,
    forecast_raw: Value,
}

impl WeatherPayload {
    pub(crate) fn new(fact: Fact, forecast: Forecast, forecast_raw: Value) -> Self {
        Self {
            fact,
            forecast,
            forecast_raw,
        }
    }

    /// Project the current-conditions response.
    pub fn current(&self) -> CurrentConditions {
        CurrentConditions {
            temp: self.fact.temp,
            pressure_mm: self.fact.pressure_mm,
            wind_speed: self.fact.wind_speed,
        }
    }

    /// The upstream `forecast` object as received.
    pub fn raw_forecast(&self) -> &Value {
        &self.forecast_raw
    }
}

/// Body of `GET /weather`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentConditions {
    pub temp: f64,
    pub pressure_mm: f64,
    pub wind_speed: f64,
}
