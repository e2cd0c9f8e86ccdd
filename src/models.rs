use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

// ============ Location ============

/// A validated point on the globe.
///
/// Fields are private so every instance has passed the range check in
/// [`Coordinates::new`], including ones built by deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct RawCoordinates {
    lat: f64,
    lon: f64,
}

impl Coordinates {
    /// Builds coordinates, returning `None` when either value is out of range or not finite.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let lat_ok = lat.is_finite() && (-90.0..=90.0).contains(&lat);
        let lon_ok = lon.is_finite() && (-180.0..=180.0).contains(&lon);
        (lat_ok && lon_ok).then_some(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = String;

    fn try_from(raw: RawCoordinates) -> Result<Self, Self::Error> {
        Coordinates::new(raw.lat, raw.lon)
            .ok_or_else(|| format!("coordinates out of range: ({}, {})", raw.lat, raw.lon))
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lon)
    }
}

// ============ Health Profile ============

/// Health conditions the user can declare.
///
/// Wire names are the human labels; the compact identifiers are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Condition {
    Asthma,
    #[serde(rename = "COPD")]
    Copd,
    #[serde(rename = "Heart Disease", alias = "HeartDisease")]
    HeartDisease,
    Allergies,
    Pregnancy,
    #[serde(rename = "Children (under 12)", alias = "ChildUnder12")]
    ChildUnder12,
    #[serde(rename = "Elderly (65+)", alias = "ElderlyOver65")]
    ElderlyOver65,
    None,
}

impl Condition {
    pub const ALL: [Condition; 8] = [
        Condition::Asthma,
        Condition::Copd,
        Condition::HeartDisease,
        Condition::Allergies,
        Condition::Pregnancy,
        Condition::ChildUnder12,
        Condition::ElderlyOver65,
        Condition::None,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Condition::Asthma => "Asthma",
            Condition::Copd => "COPD",
            Condition::HeartDisease => "Heart Disease",
            Condition::Allergies => "Allergies",
            Condition::Pregnancy => "Pregnancy",
            Condition::ChildUnder12 => "Children (under 12)",
            Condition::ElderlyOver65 => "Elderly (65+)",
            Condition::None => "None",
        }
    }
}

/// Planned intensity of the outdoor activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    #[serde(alias = "Light")]
    Light,
    #[default]
    #[serde(alias = "Moderate")]
    Moderate,
    #[serde(alias = "Intense")]
    Intense,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 3] = [
        ActivityLevel::Light,
        ActivityLevel::Moderate,
        ActivityLevel::Intense,
    ];

    pub fn value(&self) -> &'static str {
        match self {
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Intense => "intense",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActivityLevel::Light => "Light (Walking, errands)",
            ActivityLevel::Moderate => "Moderate (Jogging, cycling)",
            ActivityLevel::Intense => "Intense (Running, sports)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("at least one health condition is required (use \"None\" if not applicable)")]
    Empty,
    #[error("\"None\" cannot be combined with other health conditions")]
    NoneNotExclusive,
}

/// The user's declared health context.
///
/// `Condition::None`, when present, is always the only condition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawHealthProfile")]
pub struct HealthProfile {
    conditions: BTreeSet<Condition>,
    age_group: Option<String>,
    activity_level: ActivityLevel,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHealthProfile {
    #[serde(default)]
    conditions: Vec<Condition>,
    #[serde(default, alias = "age")]
    age_group: Option<String>,
    #[serde(default)]
    activity_level: ActivityLevel,
}

impl TryFrom<RawHealthProfile> for HealthProfile {
    type Error = ProfileError;

    fn try_from(raw: RawHealthProfile) -> Result<Self, Self::Error> {
        HealthProfile::new(raw.conditions, raw.age_group, raw.activity_level)
    }
}

impl HealthProfile {
    /// Builds a profile ready for submission.
    pub fn new(
        conditions: impl IntoIterator<Item = Condition>,
        age_group: Option<String>,
        activity_level: ActivityLevel,
    ) -> Result<Self, ProfileError> {
        let profile = Self {
            conditions: conditions.into_iter().collect(),
            age_group: age_group.filter(|a| !a.trim().is_empty()),
            activity_level,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Checks the submission rules: non-empty, and `None` only on its own.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.conditions.is_empty() {
            return Err(ProfileError::Empty);
        }
        if self.conditions.contains(&Condition::None) && self.conditions.len() > 1 {
            return Err(ProfileError::NoneNotExclusive);
        }
        Ok(())
    }

    /// Flips one condition the way the profile form does.
    ///
    /// Selecting `None` clears everything else; selecting anything else drops `None`.
    pub fn toggle_condition(&mut self, condition: Condition) {
        if condition == Condition::None {
            self.conditions.clear();
            self.conditions.insert(Condition::None);
            return;
        }

        self.conditions.remove(&Condition::None);
        if !self.conditions.remove(&condition) {
            self.conditions.insert(condition);
        }
    }

    pub fn set_age_group(&mut self, age_group: Option<String>) {
        self.age_group = age_group.filter(|a| !a.trim().is_empty());
    }

    pub fn set_activity_level(&mut self, activity_level: ActivityLevel) {
        self.activity_level = activity_level;
    }

    pub fn conditions(&self) -> &BTreeSet<Condition> {
        &self.conditions
    }

    pub fn age_group(&self) -> Option<&str> {
        self.age_group.as_deref()
    }

    pub fn activity_level(&self) -> ActivityLevel {
        self.activity_level
    }
}

// ============ Environmental Snapshot ============

/// One normalized bundle of weather and air-quality measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalSnapshot {
    pub aqi: u32,
    pub pm25: f64,
    pub pm10: f64,
    pub o3: f64,
    pub no2: f64,
    pub so2: f64,
    pub co: f64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub pressure_hpa: f64,
    pub wind_kph: f64,
    pub visibility_km: f64,
    pub description: String,
    pub location_name: String,
    /// Name of the reporting station, when the air-quality service gives one.
    pub station_name: String,
    pub dominant_pollutant: String,
    pub observed_at: DateTime<Utc>,
    pub coordinates: Coordinates,
    /// Set when any value was fabricated because an upstream source failed.
    pub synthetic: bool,
}

impl EnvironmentalSnapshot {
    pub fn aqi_category(&self) -> AqiCategory {
        AqiCategory::from_aqi(self.aqi)
    }
}

/// Standard AQI bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    pub fn from_aqi(aqi: u32) -> Self {
        match aqi {
            0..=50 => AqiCategory::Good,
            51..=100 => AqiCategory::Moderate,
            101..=150 => AqiCategory::UnhealthyForSensitive,
            151..=200 => AqiCategory::Unhealthy,
            201..=300 => AqiCategory::VeryUnhealthy,
            _ => AqiCategory::Hazardous,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthyForSensitive => "Unhealthy for Sensitive",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }
}

// ============ Decision ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "GO")]
    Go,
    #[serde(rename = "CAUTION")]
    Caution,
    #[serde(rename = "NO-GO")]
    NoGo,
}

impl Verdict {
    pub const ALL: [Verdict; 3] = [Verdict::Go, Verdict::Caution, Verdict::NoGo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Go => "GO",
            Verdict::Caution => "CAUTION",
            Verdict::NoGo => "NO-GO",
        }
    }

    /// Case-insensitive match against the wire labels.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(label))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    #[serde(rename = "Very High", alias = "VeryHigh")]
    VeryHigh,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Moderate,
        RiskLevel::High,
        RiskLevel::VeryHigh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
            RiskLevel::VeryHigh => "Very High",
        }
    }

    /// Case-insensitive match; "VeryHigh" is accepted for "Very High".
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("VeryHigh") {
            return Some(RiskLevel::VeryHigh);
        }
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(label))
    }
}

/// Which path produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionSource {
    Reasoning,
    Fallback,
}

/// The engine's final answer for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub verdict: Verdict,
    pub risk_level: RiskLevel,
    pub primary_concern: String,
    pub explanation: String,
    /// Never empty.
    pub recommendations: Vec<String>,
    pub forecast: String,
    pub safe_timing: String,
    pub snapshot: EnvironmentalSnapshot,
    pub decided_at: DateTime<Utc>,
    pub source: DecisionSource,
}
