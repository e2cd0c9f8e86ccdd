//! Payloads returned by the external weather, air-quality and reasoning services.
//!
//! Every field is optional: the upstream services omit data freely and the
//! aggregator decides what a missing value means.

use serde::Deserialize;
use serde_json::Value;

// ============ Weather / Geocoding ============

/// Response of both the city lookup and the lat/lon lookup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherResponse {
    pub coord: Option<WeatherCoord>,
    pub name: Option<String>,
    pub main: Option<WeatherMain>,
    pub wind: Option<WeatherWind>,
    /// Meters.
    pub visibility: Option<f64>,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherCoord {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherMain {
    /// Kelvin.
    pub temp: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherWind {
    /// Meters per second.
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherCondition {
    pub description: Option<String>,
}

impl WeatherResponse {
    pub fn description(&self) -> Option<&str> {
        self.weather
            .first()
            .and_then(|w| w.description.as_deref())
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

// ============ Air Quality ============

/// Envelope of the air-quality feed.
///
/// On errors `data` is a plain message string rather than an object.
#[derive(Debug, Clone, Deserialize)]
pub struct AirQualityEnvelope {
    pub status: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AirQualityData {
    /// Usually a number, but stations without a reading report `"-"`.
    #[serde(default)]
    pub aqi: Value,
    #[serde(default)]
    pub iaqi: IndividualReadings,
    pub city: Option<AirQualityCity>,
    pub dominentpol: Option<String>,
    pub time: Option<AirQualityTime>,
}

/// Per-pollutant readings, plus humidity (`h`) and pressure (`p`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndividualReadings {
    pub pm25: Option<Reading>,
    pub pm10: Option<Reading>,
    pub o3: Option<Reading>,
    pub no2: Option<Reading>,
    pub so2: Option<Reading>,
    pub co: Option<Reading>,
    pub h: Option<Reading>,
    pub p: Option<Reading>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reading {
    pub v: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirQualityCity {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirQualityTime {
    /// Local station time, `YYYY-MM-DD HH:MM:SS`.
    pub s: Option<String>,
    pub iso: Option<String>,
}

/// Reads the value out of an optional reading.
pub fn reading(field: &Option<Reading>) -> Option<f64> {
    field.as_ref().and_then(|r| r.v).filter(|v| v.is_finite())
}

impl AirQualityData {
    /// Numeric AQI, or `None` when the station reported no usable value.
    pub fn aqi_value(&self) -> Option<f64> {
        let value: Option<f64> = match &self.aqi {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        value.filter(|v| v.is_finite() && *v >= 0.0)
    }

    pub fn city_name(&self) -> Option<&str> {
        self.city
            .as_ref()
            .and_then(|c| c.name.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

// ============ Reasoning ============

#[derive(Debug, Clone, Deserialize)]
pub struct ReasoningResponse {
    #[serde(default)]
    pub content: Vec<ReasoningContentBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReasoningContentBlock {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<String>,
}

impl ReasoningResponse {
    /// Text of the first content block, if it carries any.
    pub fn first_text(&self) -> Option<&str> {
        self.content
            .first()
            .filter(|block| block.kind.as_deref().map_or(true, |k| k == "text"))
            .and_then(|block| block.text.as_deref())
    }
}
