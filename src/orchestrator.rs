//! End-to-end analysis: resolve, aggregate, compose, reason, parse or fall back.
//!
//! Each call is self-contained. The orchestrator only holds configuration and
//! stateless HTTP clients, so analyses for different locations can run
//! concurrently, and dropping an in-flight `analyze` future cancels it without
//! leaving anything half-applied.

use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;

use crate::aggregator::EnvironmentalAggregator;
use crate::config::Config;
use crate::errors::PipelineError;
use crate::fallback::FallbackDecisionPolicy;
use crate::models::{Coordinates, Decision, EnvironmentalSnapshot, HealthProfile};
use crate::parser::{self, ParsedDecision};
use crate::prompt::DecisionRequestComposer;
use crate::reasoning_client::{AnthropicReasoningClient, ReasoningClient};
use crate::resolver::CoordinateResolver;
use crate::services::{AirQualityService, WeatherService};

pub struct DecisionOrchestrator {
    resolver: CoordinateResolver,
    aggregator: EnvironmentalAggregator,
    composer: DecisionRequestComposer,
    reasoning: Arc<dyn ReasoningClient>,
    default_coordinates: Coordinates,
}

impl DecisionOrchestrator {
    pub fn new(
        resolver: CoordinateResolver,
        aggregator: EnvironmentalAggregator,
        composer: DecisionRequestComposer,
        reasoning: Arc<dyn ReasoningClient>,
        default_coordinates: Coordinates,
    ) -> Self {
        Self {
            resolver,
            aggregator,
            composer,
            reasoning,
            default_coordinates,
        }
    }

    /// Wire up the production clients described by `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        let weather = WeatherService::new(client.clone(), &config.weather);
        let air_quality = AirQualityService::new(client.clone(), &config.air_quality);
        let reasoning =
            AnthropicReasoningClient::new(client, &config.reasoning, config.request_timeout);

        Ok(Self::new(
            CoordinateResolver::new(weather.clone(), config.default_location.display_name.clone()),
            EnvironmentalAggregator::new(weather, air_quality, config.pollutant_ratios),
            DecisionRequestComposer::from_config(&config.reasoning),
            Arc::new(reasoning),
            config.default_location.coordinates,
        ))
    }

    /// Replace the aggregator, e.g. with a seeded one.
    pub fn with_aggregator(mut self, aggregator: EnvironmentalAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Replace the reasoning client.
    pub fn with_reasoning_client(mut self, reasoning: Arc<dyn ReasoningClient>) -> Self {
        self.reasoning = reasoning;
        self
    }

    /// Produce exactly one decision for `location_text` and `profile`.
    ///
    /// Never fails: reasoning errors switch the whole call to the fallback policy.
    pub async fn analyze(&self, location_text: &str, profile: &HealthProfile) -> Decision {
        let snapshot = self.snapshot(location_text).await;

        match self.reason(&snapshot, profile).await {
            Ok(parsed) => {
                tracing::info!(
                    "Reasoning verdict for {}: {} ({})",
                    snapshot.location_name,
                    parsed.verdict.as_str(),
                    parsed.risk_level.as_str()
                );
                parsed.into_decision(snapshot, Utc::now())
            }
            Err(e) => {
                tracing::warn!("{}, using fallback policy", e);
                let decision = FallbackDecisionPolicy::decide(snapshot);
                tracing::info!(
                    "Fallback verdict for {}: {} (AQI {})",
                    decision.snapshot.location_name,
                    decision.verdict.as_str(),
                    decision.snapshot.aqi
                );
                decision
            }
        }
    }

    /// Run only the resolve and aggregate stages.
    pub async fn snapshot(&self, location_text: &str) -> EnvironmentalSnapshot {
        let (coordinates, display_name) = self
            .resolver
            .resolve(location_text, self.default_coordinates)
            .await;
        self.aggregator.aggregate(coordinates, &display_name).await
    }

    async fn reason(
        &self,
        snapshot: &EnvironmentalSnapshot,
        profile: &HealthProfile,
    ) -> Result<ParsedDecision, PipelineError> {
        let payload = self.composer.compose(snapshot, profile);
        let raw = self.reasoning.invoke(&payload).await?;
        parser::parse(&raw)
    }
}
