//! Schema validation of upstream payloads.
//!
//! Validation fails closed: the first missing or mistyped required field
//! rejects the whole payload, and the error names that field.

use serde_json::{Map, Value};

use crate::error::{SchemaError, SchemaProblem};
use crate::types::{Fact, Forecast, Part, WeatherPayload};

/// Validate a raw upstream body.
pub fn validate(raw: &[u8]) -> Result<WeatherPayload, SchemaError> {
    let value: Value = serde_json::from_slice(raw).map_err(|e| SchemaError {
        field: "$".to_string(),
        problem: SchemaProblem::InvalidJson(e.to_string()),
    })?;
    validate_value(value)
}

/// Validate an already-parsed upstream body.
pub fn validate_value(value: Value) -> Result<WeatherPayload, SchemaError> {
    let (fact, forecast) = {
        let root = Fields::root(&value)?;
        let fact = parse_fact(&root.object("fact")?)?;
        let forecast = parse_forecast(&root.object("forecast")?)?;
        (fact, forecast)
    };

    let forecast_raw = match value {
        Value::Object(mut map) => map.remove("forecast").unwrap_or(Value::Null),
        _ => Value::Null,
    };

    Ok(WeatherPayload::new(fact, forecast, forecast_raw))
}

/// Validate a bare `forecast` object, as served by `GET /forecast`.
pub fn validate_forecast(value: &Value) -> Result<Forecast, SchemaError> {
    parse_forecast(&Fields::root(value)?)
}

fn parse_fact(fields: &Fields<'_>) -> Result<Fact, SchemaError> {
    Ok(Fact {
        temp: fields.float("temp")?,
        pressure_mm: fields.float("pressure_mm")?,
        wind_speed: fields.float("wind_speed")?,
    })
}

fn parse_forecast(fields: &Fields<'_>) -> Result<Forecast, SchemaError> {
    let date = fields.string("date")?;
    let date_ts = fields.int("date_ts")?;
    let week = fields.int("week")?;
    let sunrise = fields.opt_string("sunrise")?;
    let sunset = fields.opt_string("sunset")?;
    let moon_code = fields.int("moon_code")?;
    let moon_text = fields.string("moon_text")?;

    let parts = fields
        .array("parts")?
        .iter()
        .enumerate()
        .map(|(index, value)| parse_part(&fields.element("parts", index, value)?))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Forecast {
        date,
        date_ts,
        week,
        sunrise,
        sunset,
        moon_code,
        moon_text,
        parts,
    })
}

fn parse_part(fields: &Fields<'_>) -> Result<Part, SchemaError> {
    Ok(Part {
        part_name: fields.string("part_name")?,
        temp_min: fields.float("temp_min")?,
        temp_max: fields.float("temp_max")?,
        temp_avg: fields.float("temp_avg")?,
        feels_like: fields.float("feels_like")?,
        icon: fields.string("icon")?,
        condition: fields.string("condition")?,
        daytime: fields.string("daytime")?,
        polar: fields.opt_bool("polar")?,
        wind_speed: fields.float("wind_speed")?,
        wind_gust: fields.float("wind_gust")?,
        wind_dir: fields.string("wind_dir")?,
        pressure_mm: fields.float("pressure_mm")?,
        pressure_pa: fields.float("pressure_pa")?,
        humidity: fields.float("humidity")?,
        prec_mm: fields.float("prec_mm")?,
        prec_period: fields.float("prec_period")?,
        prec_prob: fields.float("prec_prob")?,
    })
}

/// A JSON object together with its path from the document root.
struct Fields<'a> {
    map: &'a Map<String, Value>,
    path: String,
}

impl<'a> Fields<'a> {
    fn root(value: &'a Value) -> Result<Self, SchemaError> {
        value
            .as_object()
            .map(|map| Self {
                map,
                path: String::new(),
            })
            .ok_or_else(|| SchemaError::wrong_type("$", "object"))
    }

    fn path_of(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path, name)
        }
    }

    /// Null counts as absent.
    fn optional(&self, name: &str) -> Option<&'a Value> {
        self.map.get(name).filter(|v| !v.is_null())
    }

    fn required(&self, name: &str) -> Result<&'a Value, SchemaError> {
        self.optional(name)
            .ok_or_else(|| SchemaError::missing(self.path_of(name)))
    }

    fn object(&self, name: &str) -> Result<Fields<'a>, SchemaError> {
        let path = self.path_of(name);
        match self.required(name)?.as_object() {
            Some(map) => Ok(Fields { map, path }),
            None => Err(SchemaError::wrong_type(path, "object")),
        }
    }

    fn array(&self, name: &str) -> Result<&'a Vec<Value>, SchemaError> {
        self.required(name)?
            .as_array()
            .ok_or_else(|| SchemaError::wrong_type(self.path_of(name), "array"))
    }

    fn element(
        &self,
        name: &str,
        index: usize,
        value: &'a Value,
    ) -> Result<Fields<'a>, SchemaError> {
        let path = format!("{}[{}]", self.path_of(name), index);
        match value.as_object() {
            Some(map) => Ok(Fields { map, path }),
            None => Err(SchemaError::wrong_type(path, "object")),
        }
    }

    fn float(&self, name: &str) -> Result<f64, SchemaError> {
        self.required(name)?
            .as_f64()
            .ok_or_else(|| SchemaError::wrong_type(self.path_of(name), "number"))
    }

    /// Integers, or floats without a fractional part.
    fn int(&self, name: &str) -> Result<i64, SchemaError> {
        let value = self.required(name)?;
        value
            .as_i64()
            .or_else(|| {
                value
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .ok_or_else(|| SchemaError::wrong_type(self.path_of(name), "integer"))
    }

    fn string(&self, name: &str) -> Result<String, SchemaError> {
        self.required(name)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SchemaError::wrong_type(self.path_of(name), "string"))
    }

    fn opt_string(&self, name: &str) -> Result<Option<String>, SchemaError> {
        self.optional(name)
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| SchemaError::wrong_type(self.path_of(name), "string"))
            })
            .transpose()
    }

    fn opt_bool(&self, name: &str) -> Result<Option<bool>, SchemaError> {
        self.optional(name)
            .map(|v| {
                v.as_bool()
                    .ok_or_else(|| SchemaError::wrong_type(self.path_of(name), "boolean"))
            })
            .transpose()
    }
}
