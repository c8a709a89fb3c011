//! City name to coordinate lookup.
//!
//! Names match exactly after trimming and lowercasing. Tables come from a
//! `City,Latitude,Longitude` CSV file or from the built-in list.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use crate::types::CoordinateKey;

/// Maps a city name to its coordinates.
pub trait CoordinateResolver: Send + Sync {
    /// `None` when the name is unknown.
    fn resolve(&self, city: &str) -> Option<CoordinateKey>;
}

#[derive(Debug, Error)]
pub enum CityTableError {
    #[error("Failed to read city table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("City table is missing column {0}")]
    MissingColumn(&'static str),

    #[error("Line {line}: {message}")]
    BadRow { line: usize, message: String },

    #[error("City table is empty")]
    Empty,

    #[error("Malformed city table: {0}")]
    Csv(#[from] csv::Error),
}

/// Major Russian cities, English and Russian spellings.
const BUILTIN_CITIES: &[(&str, &str, f64, f64)] = &[
    ("Moscow", "Москва", 55.75, 37.62),
    ("Saint Petersburg", "Санкт-Петербург", 59.94, 30.31),
    ("Novosibirsk", "Новосибирск", 55.03, 82.92),
    ("Yekaterinburg", "Екатеринбург", 56.84, 60.61),
    ("Kazan", "Казань", 55.79, 49.12),
    ("Nizhny Novgorod", "Нижний Новгород", 56.33, 44.0),
    ("Chelyabinsk", "Челябинск", 55.16, 61.4),
    ("Samara", "Самара", 53.2, 50.15),
    ("Omsk", "Омск", 54.99, 73.37),
    ("Rostov-on-Don", "Ростов-на-Дону", 47.23, 39.72),
    ("Ufa", "Уфа", 54.74, 55.97),
    ("Krasnoyarsk", "Красноярск", 56.01, 92.87),
    ("Voronezh", "Воронеж", 51.67, 39.18),
    ("Perm", "Пермь", 58.01, 56.25),
    ("Volgograd", "Волгоград", 48.71, 44.51),
    ("Krasnodar", "Краснодар", 45.04, 38.98),
    ("Sochi", "Сочи", 43.6, 39.73),
    ("Vladivostok", "Владивосток", 43.12, 131.89),
    ("Irkutsk", "Иркутск", 52.29, 104.28),
    ("Kaliningrad", "Калининград", 54.71, 20.51),
    ("Murmansk", "Мурманск", 68.97, 33.07),
    ("Yakutsk", "Якутск", 62.03, 129.73),
];

/// Static city table.
#[derive(Debug, Clone, Default)]
pub struct CityTable {
    cities: HashMap<String, CoordinateKey>,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl CityTable {
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for (english, russian, lat, lon) in BUILTIN_CITIES {
            let key = CoordinateKey::new(*lat, *lon);
            table.insert(english, key);
            table.insert(russian, key);
        }
        table
    }

    /// Parse CSV text. The header must name `City`, `Latitude` and
    /// `Longitude`; other columns are ignored. Fields may be quoted and
    /// blank lines are skipped.
    pub fn from_csv_str(text: &str) -> Result<Self, CityTableError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(text.trim_start_matches('\u{feff}').as_bytes());

        let headers = reader.headers()?.clone();
        if headers.iter().all(str::is_empty) {
            return Err(CityTableError::Empty);
        }
        let position = |name: &'static str| {
            headers
                .iter()
                .position(|column| column.eq_ignore_ascii_case(name))
                .ok_or(CityTableError::MissingColumn(name))
        };
        let city_col = position("City")?;
        let lat_col = position("Latitude")?;
        let lon_col = position("Longitude")?;

        let mut table = Self::default();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let line = record.position().map_or(0, |pos| pos.line() as usize);

            let cell = |index: usize, name: &str| {
                record.get(index).ok_or_else(|| CityTableError::BadRow {
                    line,
                    message: format!("missing {}", name),
                })
            };
            let number = |index: usize, name: &str| -> Result<f64, CityTableError> {
                let raw = cell(index, name)?;
                raw.parse().map_err(|_| CityTableError::BadRow {
                    line,
                    message: format!("invalid {} '{}'", name, raw),
                })
            };

            let city = cell(city_col, "city")?;
            if city.is_empty() {
                return Err(CityTableError::BadRow {
                    line,
                    message: "empty city name".to_string(),
                });
            }
            let lat = number(lat_col, "latitude")?;
            let lon = number(lon_col, "longitude")?;

            if !table.insert(city, CoordinateKey::new(lat, lon)) {
                tracing::debug!("Duplicate city '{}' on line {}, keeping first", city, line);
            }
        }

        Ok(table)
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, CityTableError> {
        let text = std::fs::read_to_string(path).map_err(|source| CityTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_csv_str(&text)?;
        tracing::info!("Loaded {} cities from {}", table.len(), path.display());
        Ok(table)
    }

    /// Load from `path` if given, otherwise use the built-in table.
    pub fn load(path: Option<&Path>) -> Result<Self, CityTableError> {
        match path {
            Some(path) => Self::from_csv_path(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Returns false if the name was already present.
    fn insert(&mut self, name: &str, key: CoordinateKey) -> bool {
        let name = normalize(name);
        if self.cities.contains_key(&name) {
            return false;
        }
        self.cities.insert(name, key);
        true
    }
}

impl CoordinateResolver for CityTable {
    fn resolve(&self, city: &str) -> Option<CoordinateKey> {
        self.cities.get(&normalize(city)).copied()
    }
}
