//! Validation of the reasoning service's decision payload.
//!
//! The service is asked to answer with a fixed JSON shape, but nothing it
//! returns is trusted: every field is checked here against [`DecisionSchema`].

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::errors::PipelineError;
use crate::models::{Decision, DecisionSource, EnvironmentalSnapshot, RiskLevel, Verdict};

pub const REQUIRED_FIELDS: [&str; 7] = [
    "verdict",
    "riskLevel",
    "primaryConcern",
    "explanation",
    "recommendations",
    "forecast",
    "safeTiming",
];

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```(?:json)?").expect("code fence pattern is valid"));

/// The decision contract shared by the prompt and the validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionSchema {
    pub required_fields: Vec<&'static str>,
    pub verdicts: Vec<&'static str>,
    pub risk_levels: Vec<&'static str>,
}

impl Default for DecisionSchema {
    fn default() -> Self {
        Self {
            required_fields: REQUIRED_FIELDS.to_vec(),
            verdicts: Verdict::ALL.iter().map(Verdict::as_str).collect(),
            risk_levels: RiskLevel::ALL.iter().map(RiskLevel::as_str).collect(),
        }
    }
}

impl DecisionSchema {
    /// Render the contract as the annotated JSON template placed in the prompt.
    pub fn render_template(&self) -> String {
        let alternatives = |values: &[&str]| {
            values
                .iter()
                .map(|v| format!("\"{}\"", v))
                .collect::<Vec<_>>()
                .join(" or ")
        };

        format!(
            r#"{{
  "verdict": {},
  "riskLevel": {},
  "primaryConcern": "brief description",
  "explanation": "2-3 sentence explanation of why this decision was made",
  "recommendations": ["action 1", "action 2", "action 3"],
  "forecast": "what to expect in next 3-6 hours",
  "safeTiming": "suggested safer time window if applicable"
}}"#,
            alternatives(&self.verdicts),
            alternatives(&self.risk_levels)
        )
    }
}

/// A decision as returned by the reasoning service, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDecision {
    pub verdict: Verdict,
    pub risk_level: RiskLevel,
    pub primary_concern: String,
    pub explanation: String,
    pub recommendations: Vec<String>,
    pub forecast: String,
    pub safe_timing: String,
}

impl ParsedDecision {
    pub fn into_decision(self, snapshot: EnvironmentalSnapshot, decided_at: DateTime<Utc>) -> Decision {
        Decision {
            verdict: self.verdict,
            risk_level: self.risk_level,
            primary_concern: self.primary_concern,
            explanation: self.explanation,
            recommendations: self.recommendations,
            forecast: self.forecast,
            safe_timing: self.safe_timing,
            snapshot,
            decided_at,
            source: DecisionSource::Reasoning,
        }
    }
}

/// Remove markdown code fences and surrounding whitespace.
pub fn strip_formatting(raw: &str) -> String {
    CODE_FENCE.replace_all(raw.trim(), "").trim().to_string()
}

/// Parse and validate raw reasoning output.
pub fn parse(raw: &str) -> Result<ParsedDecision, PipelineError> {
    let cleaned = strip_formatting(raw);
    if cleaned.is_empty() {
        return Err(malformed("response is empty"));
    }

    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|e| malformed(format!("response is not valid JSON: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| malformed("response is not a JSON object"))?;

    if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !object.contains_key(**f)) {
        return Err(malformed(format!("missing required field `{}`", missing)));
    }

    let verdict_label = string_field(object, "verdict")?;
    let verdict = Verdict::from_label(&verdict_label)
        .ok_or_else(|| malformed(format!("unknown verdict `{}`", verdict_label)))?;

    let risk_label = string_field(object, "riskLevel")?;
    let risk_level = RiskLevel::from_label(&risk_label)
        .ok_or_else(|| malformed(format!("unknown riskLevel `{}`", risk_label)))?;

    Ok(ParsedDecision {
        verdict,
        risk_level,
        primary_concern: string_field(object, "primaryConcern")?,
        explanation: string_field(object, "explanation")?,
        recommendations: recommendations(object)?,
        forecast: string_field(object, "forecast")?,
        safe_timing: string_field(object, "safeTiming")?,
    })
}

fn string_field(object: &Map<String, Value>, name: &str) -> Result<String, PipelineError> {
    object
        .get(name)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| malformed(format!("field `{}` is not a string", name)))
}

fn recommendations(object: &Map<String, Value>) -> Result<Vec<String>, PipelineError> {
    let items = object
        .get("recommendations")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("field `recommendations` is not an array"))?;

    if items.is_empty() {
        return Err(malformed("field `recommendations` is empty"));
    }

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(|s| s.trim().to_string())
                .ok_or_else(|| malformed("field `recommendations` contains a non-string entry"))
        })
        .collect()
}

fn malformed(reason: impl Into<String>) -> PipelineError {
    PipelineError::MalformedResponse(reason.into())
}
