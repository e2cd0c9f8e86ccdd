/// Unit tests for the decision engine
/// Tests profile rules, prompt composition, response parsing, and the orchestrator with a stubbed reasoning client
use aq_verdict_api::aggregator::{synthesize_snapshot, EnvironmentalAggregator};
use aq_verdict_api::config::{Config, PollutantRatios};
use aq_verdict_api::errors::PipelineError;
use aq_verdict_api::models::{
    ActivityLevel, Condition, Coordinates, DecisionSource, EnvironmentalSnapshot, HealthProfile,
    ProfileError, RiskLevel, Verdict,
};
use aq_verdict_api::orchestrator::DecisionOrchestrator;
use aq_verdict_api::parser::parse;
use aq_verdict_api::prompt::{DecisionRequestComposer, RequestPayload};
use aq_verdict_api::reasoning_client::ReasoningClient;
use aq_verdict_api::services::{AirQualityService, WeatherService};
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn mumbai() -> Coordinates {
    Coordinates::new(19.0760, 72.8777).unwrap()
}

fn snapshot_with_aqi(aqi: u32) -> EnvironmentalSnapshot {
    let mut snapshot = synthesize_snapshot(
        mumbai(),
        "Mumbai",
        &PollutantRatios::default(),
        &mut StdRng::seed_from_u64(1),
        Utc::now(),
    );
    snapshot.aqi = aqi;
    snapshot.synthetic = false;
    snapshot
}

/// Reasoning client that replays a canned answer and records prompts.
struct StubReasoning {
    answer: Result<String, PipelineError>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubReasoning {
    fn new(answer: Result<String, PipelineError>) -> Arc<Self> {
        Arc::new(Self {
            answer,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ReasoningClient for StubReasoning {
    async fn invoke(&self, payload: &RequestPayload) -> Result<String, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(payload.prompt.clone());
        self.answer.clone()
    }
}

/// Orchestrator whose upstream services are unreachable, so every snapshot is synthetic.
fn offline_orchestrator(reasoning: Arc<StubReasoning>) -> DecisionOrchestrator {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("WEATHER_API_KEY", "k"),
        ("WEATHER_BASE_URL", "http://127.0.0.1:1"),
        ("AQI_TOKEN", "t"),
        ("AQI_BASE_URL", "http://127.0.0.1:1"),
        ("REQUEST_TIMEOUT_MS", "500"),
    ]);
    let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

    let client = reqwest::Client::new();
    let aggregator = EnvironmentalAggregator::new(
        WeatherService::new(client.clone(), &config.weather),
        AirQualityService::new(client, &config.air_quality),
        config.pollutant_ratios,
    )
    .with_seed(99);

    DecisionOrchestrator::from_config(&config)
        .unwrap()
        .with_aggregator(aggregator)
        .with_reasoning_client(reasoning)
}

const VALID_ANSWER: &str = r#"{
    "verdict": "CAUTION",
    "riskLevel": "Moderate",
    "primaryConcern": "Ozone in the afternoon",
    "explanation": "Ozone builds up later in the day.",
    "recommendations": ["Go before 9am", "Take breaks"],
    "forecast": "Ozone peaks mid-afternoon",
    "safeTiming": "Before 9am"
}"#;

#[cfg(test)]
mod profile_tests {
    use super::*;

    #[test]
    fn test_empty_profile_rejected() {
        let result = HealthProfile::new(vec![], None, ActivityLevel::Light);
        assert_eq!(result.unwrap_err(), ProfileError::Empty);
    }

    #[test]
    fn test_none_must_be_exclusive() {
        let result = HealthProfile::new(
            vec![Condition::None, Condition::Copd],
            None,
            ActivityLevel::Light,
        );
        assert_eq!(result.unwrap_err(), ProfileError::NoneNotExclusive);

        assert!(HealthProfile::new(vec![Condition::None], None, ActivityLevel::Light).is_ok());
    }

    #[test]
    fn test_toggle_none_clears_others() {
        let mut profile = HealthProfile::new(
            vec![Condition::Asthma, Condition::Pregnancy],
            None,
            ActivityLevel::Moderate,
        )
        .unwrap();

        profile.toggle_condition(Condition::None);
        assert_eq!(profile.conditions().len(), 1);
        assert!(profile.conditions().contains(&Condition::None));

        profile.toggle_condition(Condition::Allergies);
        assert!(!profile.conditions().contains(&Condition::None));
        assert!(profile.conditions().contains(&Condition::Allergies));
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_profile_rejected_at_deserialization() {
        let result: Result<HealthProfile, _> =
            serde_json::from_str(r#"{"conditions": ["None", "Asthma"]}"#);
        assert!(result.is_err());

        let result: Result<HealthProfile, _> = serde_json::from_str(r#"{"conditions": ["Flu"]}"#);
        assert!(result.is_err());
    }
}

#[cfg(test)]
mod composer_tests {
    use super::*;

    #[test]
    fn test_prompt_carries_snapshot_and_profile() {
        let profile = HealthProfile::new(
            vec![Condition::Asthma, Condition::ElderlyOver65],
            Some("65+".to_string()),
            ActivityLevel::Intense,
        )
        .unwrap();

        let payload = DecisionRequestComposer::new("model-x", 800)
            .compose(&snapshot_with_aqi(142), &profile);

        assert_eq!(payload.model, "model-x");
        assert_eq!(payload.max_tokens, 800);
        assert!(payload.prompt.contains("AQI: 142"));
        assert!(payload.prompt.contains("Asthma"));
        assert!(payload.prompt.contains("Elderly (65+)"));
        assert!(payload.prompt.contains("Intense (Running, sports)"));
        assert!(payload.prompt.contains("\"NO-GO\""));
        assert!(payload.prompt.contains("\"Very High\""));
        assert!(!payload.prompt.contains("estimates"));
    }

    #[test]
    fn test_prompt_flags_synthetic_data() {
        let profile = HealthProfile::new(vec![Condition::None], None, ActivityLevel::Light).unwrap();
        let mut snapshot = snapshot_with_aqi(60);
        snapshot.synthetic = true;

        let payload = DecisionRequestComposer::new("m", 100).compose(&snapshot, &profile);
        assert!(payload.prompt.contains("estimates"));
        assert!(payload.prompt.contains("Age Group: Not specified"));
    }

    #[test]
    fn test_request_body_shape() {
        let profile = HealthProfile::new(vec![Condition::None], None, ActivityLevel::Light).unwrap();
        let payload = DecisionRequestComposer::new("m", 100).compose(&snapshot_with_aqi(60), &profile);

        let body = payload.to_request_body();
        assert_eq!(body["model"], "m");
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], payload.prompt.as_str());
    }
}

#[cfg(test)]
mod parser_tests {
    use super::*;

    #[test]
    fn test_parse_valid_answer() {
        let parsed = parse(VALID_ANSWER).unwrap();
        assert_eq!(parsed.verdict, Verdict::Caution);
        assert_eq!(parsed.risk_level, RiskLevel::Moderate);
        assert_eq!(parsed.recommendations, vec!["Go before 9am", "Take breaks"]);
    }

    #[test]
    fn test_parse_fenced_answer() {
        let fenced = format!("```json\n{}\n```", VALID_ANSWER);
        assert_eq!(parse(&fenced).unwrap(), parse(VALID_ANSWER).unwrap());
    }

    #[test]
    fn test_parse_rejects_bad_payloads() {
        let cases: Vec<String> = vec![
            String::new(),
            "Sure! Here is my answer.".to_string(),
            "[1, 2, 3]".to_string(),
            r#"{"verdict": "GO"}"#.to_string(),
            VALID_ANSWER.replace("CAUTION", "PROBABLY"),
            VALID_ANSWER.replace("\"Moderate\"", "\"Extreme\""),
            VALID_ANSWER.replace(r#"["Go before 9am", "Take breaks"]"#, "[]"),
            VALID_ANSWER.replace(r#"["Go before 9am", "Take breaks"]"#, r#""Go early""#),
        ];

        for case in cases {
            assert!(
                matches!(parse(&case), Err(PipelineError::MalformedResponse(_))),
                "expected rejection for {:?}",
                case
            );
        }
    }
}

#[cfg(test)]
mod orchestrator_tests {
    use super::*;

    #[tokio::test]
    async fn test_valid_reasoning_is_used() {
        let reasoning = StubReasoning::new(Ok(VALID_ANSWER.to_string()));
        let orchestrator = offline_orchestrator(reasoning.clone());
        let profile = HealthProfile::new(vec![Condition::Asthma], None, ActivityLevel::Light).unwrap();

        let decision = orchestrator.analyze("", &profile).await;

        assert_eq!(reasoning.calls.load(Ordering::SeqCst), 1);
        assert_eq!(decision.source, DecisionSource::Reasoning);
        assert_eq!(decision.verdict, Verdict::Caution);
        assert!(decision.snapshot.synthetic);
        assert_eq!(decision.snapshot.location_name, "Mumbai");
        assert_eq!(decision.snapshot.coordinates, mumbai());
    }

    #[tokio::test]
    async fn test_unavailable_reasoning_falls_back() {
        let reasoning = StubReasoning::new(Err(PipelineError::ReasoningUnavailable(
            "connection refused".to_string(),
        )));
        let orchestrator = offline_orchestrator(reasoning.clone());
        let profile = HealthProfile::new(vec![Condition::None], None, ActivityLevel::Light).unwrap();

        let decision = orchestrator.analyze("", &profile).await;

        assert_eq!(reasoning.calls.load(Ordering::SeqCst), 1);
        assert_eq!(decision.source, DecisionSource::Fallback);
        let expected = aq_verdict_api::fallback::FallbackDecisionPolicy::classify(decision.snapshot.aqi);
        assert_eq!((decision.verdict, decision.risk_level), expected);
        assert_eq!(decision.recommendations.len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_reasoning_falls_back() {
        let reasoning = StubReasoning::new(Ok("I think you should stay inside.".to_string()));
        let orchestrator = offline_orchestrator(reasoning);
        let profile = HealthProfile::new(vec![Condition::Copd], None, ActivityLevel::Moderate).unwrap();

        let decision = orchestrator.analyze("", &profile).await;
        assert_eq!(decision.source, DecisionSource::Fallback);
    }

    #[tokio::test]
    async fn test_unresolvable_location_keeps_typed_name() {
        let reasoning = StubReasoning::new(Ok(VALID_ANSWER.to_string()));
        let orchestrator = offline_orchestrator(reasoning.clone());
        let profile = HealthProfile::new(vec![Condition::Asthma], None, ActivityLevel::Light).unwrap();

        let decision = orchestrator.analyze("Atlantis", &profile).await;

        assert_eq!(decision.snapshot.location_name, "Atlantis");
        assert_eq!(decision.snapshot.coordinates, mumbai());
        let prompts = reasoning.prompts.lock().unwrap();
        assert!(prompts[0].contains("Atlantis"));
    }

    #[tokio::test]
    async fn test_seeded_snapshots_repeat() {
        let orchestrator = offline_orchestrator(StubReasoning::new(Ok(VALID_ANSWER.to_string())));

        let first = orchestrator.snapshot("").await;
        let second = orchestrator.snapshot("").await;

        assert!(first.synthetic);
        assert_eq!(first.aqi, second.aqi);
        assert_eq!(first.pm25, second.pm25);
    }
}
