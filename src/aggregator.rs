//! Merges weather and air-quality feeds into one [`EnvironmentalSnapshot`].
//!
//! Aggregation never fails. When either upstream source is unavailable the
//! aggregator fabricates plausible values and marks the snapshot `synthetic`,
//! so every later stage always has something to decide on.

use chrono::{DateTime, NaiveDateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::PollutantRatios;
use crate::errors::PipelineError;
use crate::models::{Coordinates, EnvironmentalSnapshot};
use crate::services::{AirQualityService, WeatherService};
use crate::upstream_models::{reading, AirQualityData, WeatherResponse};

pub const DEFAULT_AQI: u32 = 50;
pub const DEFAULT_HUMIDITY_PCT: f64 = 60.0;
pub const DEFAULT_PRESSURE_HPA: f64 = 1013.0;
pub const DEFAULT_VISIBILITY_M: f64 = 10_000.0;
pub const DEFAULT_DESCRIPTION: &str = "Air quality data";
pub const DEFAULT_DOMINANT_POLLUTANT: &str = "pm25";
pub const SYNTHETIC_DESCRIPTION: &str = "Estimated conditions (live data unavailable)";

const KELVIN_OFFSET: f64 = 273.15;
const MS_TO_KPH: f64 = 3.6;

#[derive(Clone)]
pub struct EnvironmentalAggregator {
    weather: WeatherService,
    air_quality: AirQualityService,
    ratios: PollutantRatios,
    seed: Option<u64>,
}

impl EnvironmentalAggregator {
    pub fn new(
        weather: WeatherService,
        air_quality: AirQualityService,
        ratios: PollutantRatios,
    ) -> Self {
        Self {
            weather,
            air_quality,
            ratios,
            seed: None,
        }
    }

    /// Fix the random source used for synthetic snapshots.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build a snapshot for `coords`, falling back to synthetic data on any upstream failure.
    pub async fn aggregate(&self, coords: Coordinates, display_name_hint: &str) -> EnvironmentalSnapshot {
        match self.fetch_live(coords, display_name_hint).await {
            Ok(snapshot) => {
                tracing::info!(
                    "Live snapshot for {}: AQI {} ({})",
                    snapshot.location_name,
                    snapshot.aqi,
                    snapshot.dominant_pollutant
                );
                snapshot
            }
            Err(e) => {
                tracing::warn!("{}, synthesizing snapshot for {}", e, display_name_hint);
                let mut rng = match self.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_os_rng(),
                };
                synthesize_snapshot(coords, display_name_hint, &self.ratios, &mut rng, Utc::now())
            }
        }
    }

    async fn fetch_live(
        &self,
        coords: Coordinates,
        display_name_hint: &str,
    ) -> Result<EnvironmentalSnapshot, PipelineError> {
        let (weather, air) = tokio::join!(
            self.weather.current_weather(coords),
            self.air_quality.feed(coords)
        );
        let air = air?;
        let weather = weather?;

        merge_readings(&weather, &air, coords, display_name_hint, &self.ratios, Utc::now())
    }
}

/// Combine both upstream payloads into a live snapshot.
///
/// Pollutants the station does not report are estimated from AQI with `ratios`.
/// The only hard requirement is a temperature in the weather payload.
pub fn merge_readings(
    weather: &WeatherResponse,
    air: &AirQualityData,
    coords: Coordinates,
    display_name_hint: &str,
    ratios: &PollutantRatios,
    now: DateTime<Utc>,
) -> Result<EnvironmentalSnapshot, PipelineError> {
    let main = weather.main.clone().unwrap_or_default();
    let temp_kelvin = main.temp.filter(|t| t.is_finite()).ok_or_else(|| {
        PipelineError::AggregationFailure("Weather payload is missing main.temp".to_string())
    })?;

    let aqi = air.aqi_value().map(|v| v.round() as u32).unwrap_or(DEFAULT_AQI);
    let derived = |ratio: f64| ratio * aqi as f64;
    let iaqi = &air.iaqi;

    let humidity = main
        .humidity
        .or_else(|| reading(&iaqi.h))
        .unwrap_or(DEFAULT_HUMIDITY_PCT)
        .clamp(0.0, 100.0);
    let pressure = main
        .pressure
        .or_else(|| reading(&iaqi.p))
        .unwrap_or(DEFAULT_PRESSURE_HPA);
    let wind_ms = weather
        .wind
        .as_ref()
        .and_then(|w| w.speed)
        .unwrap_or(0.0)
        .max(0.0);
    let visibility_m = weather.visibility.unwrap_or(DEFAULT_VISIBILITY_M).max(0.0);

    let location_name = air
        .city_name()
        .map(str::to_string)
        .unwrap_or_else(|| display_name_hint.to_string());

    Ok(EnvironmentalSnapshot {
        aqi,
        pm25: reading(&iaqi.pm25).unwrap_or_else(|| derived(ratios.pm25)).max(0.0),
        pm10: reading(&iaqi.pm10).unwrap_or_else(|| derived(ratios.pm10)).max(0.0),
        o3: reading(&iaqi.o3).unwrap_or_else(|| derived(ratios.o3)).max(0.0),
        no2: reading(&iaqi.no2).unwrap_or_else(|| derived(ratios.no2)).max(0.0),
        so2: reading(&iaqi.so2).unwrap_or_else(|| derived(ratios.so2)).max(0.0),
        co: reading(&iaqi.co).unwrap_or_else(|| derived(ratios.co)).max(0.0),
        temperature_c: temp_kelvin - KELVIN_OFFSET,
        humidity_pct: humidity,
        pressure_hpa: pressure,
        wind_kph: wind_ms * MS_TO_KPH,
        visibility_km: visibility_m / 1000.0,
        description: weather
            .description()
            .unwrap_or(DEFAULT_DESCRIPTION)
            .to_string(),
        station_name: location_name.clone(),
        location_name,
        dominant_pollutant: air
            .dominentpol
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DOMINANT_POLLUTANT.to_string()),
        observed_at: observed_at(air).unwrap_or(now),
        coordinates: coords,
        synthetic: false,
    })
}

/// Fabricate a plausible snapshot from `rng`.
///
/// Same seed, same snapshot: the function has no other source of randomness.
pub fn synthesize_snapshot<R: Rng + ?Sized>(
    coords: Coordinates,
    display_name_hint: &str,
    ratios: &PollutantRatios,
    rng: &mut R,
    now: DateTime<Utc>,
) -> EnvironmentalSnapshot {
    let aqi: u32 = rng.random_range(30..180);

    EnvironmentalSnapshot {
        aqi,
        pm25: rng.random_range(15..95) as f64,
        pm10: rng.random_range(25..145) as f64,
        o3: rng.random_range(20..80) as f64,
        no2: rng.random_range(10..50) as f64,
        so2: ratios.so2 * aqi as f64,
        co: ratios.co * aqi as f64,
        temperature_c: rng.random_range(15..35) as f64,
        humidity_pct: rng.random_range(40..80) as f64,
        pressure_hpa: DEFAULT_PRESSURE_HPA,
        wind_kph: rng.random_range(0..20) as f64,
        visibility_km: DEFAULT_VISIBILITY_M / 1000.0,
        description: SYNTHETIC_DESCRIPTION.to_string(),
        location_name: display_name_hint.to_string(),
        station_name: display_name_hint.to_string(),
        dominant_pollutant: DEFAULT_DOMINANT_POLLUTANT.to_string(),
        observed_at: now,
        coordinates: coords,
        synthetic: true,
    }
}

fn observed_at(air: &AirQualityData) -> Option<DateTime<Utc>> {
    let time = air.time.as_ref()?;

    if let Some(iso) = time.iso.as_deref() {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(iso) {
            return Some(parsed.with_timezone(&Utc));
        }
    }

    time.s
        .as_deref()
        .and_then(|s| NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S").ok())
        .map(|naive| naive.and_utc())
}
