use chrono::{DateTime, Utc};

use crate::models::{Decision, DecisionSource, EnvironmentalSnapshot, RiskLevel, Verdict};

pub const FALLBACK_PRIMARY_CONCERN: &str = "Air quality analysis";
pub const FALLBACK_EXPLANATION: &str =
    "Unable to connect to AI service. This is a basic assessment based on AQI alone.";
pub const FALLBACK_RECOMMENDATIONS: [&str; 3] =
    ["Check again later", "Monitor symptoms", "Stay hydrated"];
pub const FALLBACK_FORECAST: &str = "Data unavailable";
pub const FALLBACK_SAFE_TIMING: &str = "Early morning or late evening";

/// AQI-only decision rules used whenever the reasoning path fails.
pub struct FallbackDecisionPolicy;

impl FallbackDecisionPolicy {
    /// Map an AQI to verdict and risk: below 50 GO, below 100 CAUTION, else NO-GO.
    pub fn classify(aqi: u32) -> (Verdict, RiskLevel) {
        match aqi {
            0..=49 => (Verdict::Go, RiskLevel::Low),
            50..=99 => (Verdict::Caution, RiskLevel::Moderate),
            _ => (Verdict::NoGo, RiskLevel::High),
        }
    }

    pub fn decide(snapshot: EnvironmentalSnapshot) -> Decision {
        Self::decide_at(snapshot, Utc::now())
    }

    /// Same as [`decide`](Self::decide) with the decision time supplied by the caller.
    pub fn decide_at(snapshot: EnvironmentalSnapshot, decided_at: DateTime<Utc>) -> Decision {
        let (verdict, risk_level) = Self::classify(snapshot.aqi);

        Decision {
            verdict,
            risk_level,
            primary_concern: FALLBACK_PRIMARY_CONCERN.to_string(),
            explanation: FALLBACK_EXPLANATION.to_string(),
            recommendations: FALLBACK_RECOMMENDATIONS
                .iter()
                .map(|r| r.to_string())
                .collect(),
            forecast: FALLBACK_FORECAST.to_string(),
            safe_timing: FALLBACK_SAFE_TIMING.to_string(),
            snapshot,
            decided_at,
            source: DecisionSource::Fallback,
        }
    }
}
