use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::models::Coordinates;

/// Credentials and host for the geocoding/weather service.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub api_key: String,
    pub api_host: String,
    pub base_url: String,
}

/// Token and host for the air-quality service.
#[derive(Debug, Clone)]
pub struct AirQualityConfig {
    pub token: String,
    pub base_url: String,
}

/// Reasoning service settings.
///
/// Without an API key the service runs in fallback-only mode.
#[derive(Debug, Clone)]
pub struct ReasoningConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
}

/// Where analyses land when the user gives no location or geocoding fails.
#[derive(Debug, Clone)]
pub struct DefaultLocation {
    pub coordinates: Coordinates,
    pub display_name: String,
}

/// Multipliers used to estimate a pollutant from AQI when the station does not report it.
///
/// These are rough heuristics, not an atmospheric model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollutantRatios {
    pub pm25: f64,
    pub pm10: f64,
    pub o3: f64,
    pub no2: f64,
    pub so2: f64,
    pub co: f64,
}

impl Default for PollutantRatios {
    fn default() -> Self {
        Self {
            pm25: 0.4,
            pm10: 0.6,
            o3: 0.3,
            no2: 0.25,
            so2: 0.2,
            co: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub weather: WeatherConfig,
    pub air_quality: AirQualityConfig,
    pub reasoning: ReasoningConfig,
    pub request_timeout: Duration,
    pub default_location: DefaultLocation,
    pub pollutant_ratios: PollutantRatios,
}

pub const DEFAULT_WEATHER_API_HOST: &str = "open-weather13.p.rapidapi.com";
pub const DEFAULT_AQI_BASE_URL: &str = "https://api.waqi.info";
pub const DEFAULT_REASONING_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_REASONING_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_REASONING_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_LAT: f64 = 19.0760;
pub const DEFAULT_LON: f64 = 72.8777;
pub const DEFAULT_LOCATION_NAME: &str = "Mumbai";

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    ///
    /// `from_env` passes the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let weather_api_host = var("WEATHER_API_HOST")
            .unwrap_or_else(|| DEFAULT_WEATHER_API_HOST.to_string());
        let weather_base_url = match var("WEATHER_BASE_URL") {
            Some(url) => validate_url("WEATHER_BASE_URL", url)?,
            None => format!("https://{}", weather_api_host),
        };

        let default_lat: f64 = parse_or("DEFAULT_LAT", var("DEFAULT_LAT"), DEFAULT_LAT)?;
        let default_lon: f64 = parse_or("DEFAULT_LON", var("DEFAULT_LON"), DEFAULT_LON)?;
        let default_coordinates = Coordinates::new(default_lat, default_lon).ok_or_else(|| {
            anyhow::anyhow!(
                "DEFAULT_LAT/DEFAULT_LON out of range: ({}, {})",
                default_lat,
                default_lon
            )
        })?;

        let timeout_ms: u64 = parse_or(
            "REQUEST_TIMEOUT_MS",
            var("REQUEST_TIMEOUT_MS"),
            DEFAULT_TIMEOUT_MS,
        )?;
        if timeout_ms == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_MS must be greater than zero");
        }

        let config = Self {
            port: parse_or("PORT", var("PORT"), 3000)
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            weather: WeatherConfig {
                api_key: var("WEATHER_API_KEY").ok_or_else(|| {
                    anyhow::anyhow!("WEATHER_API_KEY environment variable required")
                })?,
                api_host: weather_api_host,
                base_url: weather_base_url,
            },
            air_quality: AirQualityConfig {
                token: var("AQI_TOKEN")
                    .ok_or_else(|| anyhow::anyhow!("AQI_TOKEN environment variable required"))?,
                base_url: validate_url(
                    "AQI_BASE_URL",
                    var("AQI_BASE_URL").unwrap_or_else(|| DEFAULT_AQI_BASE_URL.to_string()),
                )?,
            },
            reasoning: ReasoningConfig {
                api_key: var("REASONING_API_KEY"),
                endpoint: validate_url(
                    "REASONING_ENDPOINT",
                    var("REASONING_ENDPOINT")
                        .unwrap_or_else(|| DEFAULT_REASONING_ENDPOINT.to_string()),
                )?,
                model: var("REASONING_MODEL")
                    .unwrap_or_else(|| DEFAULT_REASONING_MODEL.to_string()),
                max_tokens: parse_or(
                    "REASONING_MAX_TOKENS",
                    var("REASONING_MAX_TOKENS"),
                    DEFAULT_REASONING_MAX_TOKENS,
                )?,
            },
            request_timeout: Duration::from_millis(timeout_ms),
            default_location: DefaultLocation {
                coordinates: default_coordinates,
                display_name: var("DEFAULT_LOCATION_NAME")
                    .unwrap_or_else(|| DEFAULT_LOCATION_NAME.to_string()),
            },
            pollutant_ratios: PollutantRatios::default(),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Weather Base URL: {}", config.weather.base_url);
        tracing::debug!("Air Quality Base URL: {}", config.air_quality.base_url);
        tracing::debug!("Reasoning Endpoint: {}", config.reasoning.endpoint);
        if config.reasoning.api_key.is_none() {
            tracing::warn!("REASONING_API_KEY not set, every analysis will use the fallback policy");
        }
        tracing::debug!(
            "Default location: {} {}",
            config.default_location.display_name,
            config.default_location.coordinates
        );
        tracing::debug!("Request timeout: {:?}", config.request_timeout);

        Ok(config)
    }
}

fn validate_url(key: &str, url: String) -> anyhow::Result<String> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", key);
    }
    Ok(url.trim_end_matches('/').to_string())
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", key, value)),
        None => Ok(default),
    }
}
