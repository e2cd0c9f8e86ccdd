use crate::config::Config;
use crate::errors::AppError;
use crate::models::{ActivityLevel, Condition, Decision, EnvironmentalSnapshot, HealthProfile};
use crate::orchestrator::DecisionOrchestrator;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// The decision pipeline.
    pub orchestrator: Arc<DecisionOrchestrator>,
}

/// Body of `POST /api/v1/analyze`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Free-text location; empty means the configured default.
    #[serde(default)]
    pub location: String,
    pub profile: HealthProfile,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotQuery {
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    #[serde(flatten)]
    pub decision: Decision,
    pub aqi_category: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    #[serde(flatten)]
    pub snapshot: EnvironmentalSnapshot,
    pub aqi_category: &'static str,
}

/// Health check endpoint.
///
/// Returns the service status, version, and whether decisions can use the
/// reasoning service or are limited to the AQI fallback.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "aq-verdict-api",
            "version": env!("CARGO_PKG_VERSION"),
            "reasoningConfigured": state.config.reasoning.api_key.is_some()
        })),
    )
}

/// GET /api/v1/profile/options
///
/// Lists the health conditions and activity levels a profile may use.
pub async fn profile_options() -> Json<serde_json::Value> {
    let conditions: Vec<&str> = Condition::ALL.iter().map(Condition::label).collect();
    let activity_levels: Vec<serde_json::Value> = ActivityLevel::ALL
        .iter()
        .map(|level| json!({"value": level.value(), "label": level.label()}))
        .collect();

    Json(json!({
        "conditions": conditions,
        "activityLevels": activity_levels,
    }))
}

/// POST /api/v1/analyze
///
/// Runs one full analysis. Upstream failures never surface here; they show up
/// as `synthetic` on the snapshot or `source: "fallback"` on the decision.
///
/// # Returns
///
/// * `Result<Json<DecisionResponse>, AppError>` - The decision, or 400 for an invalid body.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<DecisionResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("analyze", %request_id, location = %request.location);

    async move {
        tracing::info!(
            "POST /analyze - {} condition(s), activity {}",
            request.profile.conditions().len(),
            request.profile.activity_level().value()
        );

        let decision = state
            .orchestrator
            .analyze(&request.location, &request.profile)
            .await;

        tracing::info!(
            "Decision {} via {:?} (synthetic data: {})",
            decision.verdict.as_str(),
            decision.source,
            decision.snapshot.synthetic
        );

        Ok::<_, AppError>(Json(DecisionResponse {
            aqi_category: decision.snapshot.aqi_category().label(),
            decision,
        }))
    }
    .instrument(span)
    .await
}

/// GET /api/v1/snapshot?location=
///
/// Returns the environmental snapshot without asking for a decision.
pub async fn snapshot(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SnapshotQuery>,
) -> Json<SnapshotResponse> {
    let location = params.location.unwrap_or_default();
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("snapshot", %request_id, location = %location);

    let snapshot = state
        .orchestrator
        .snapshot(&location)
        .instrument(span)
        .await;

    Json(SnapshotResponse {
        aqi_category: snapshot.aqi_category().label(),
        snapshot,
    })
}
