use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

use crate::models::ProfileError;

/// Failures raised inside the decision pipeline.
///
/// None of these reach the caller of `analyze`: each one is recovered by a
/// degraded path (default coordinates, synthetic snapshot, or the fallback
/// policy) and logged at the stage where it happened.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// Location text could not be turned into coordinates.
    #[error("Geocoding failed: {0}")]
    GeocodeFailure(String),

    /// Weather or air-quality data could not be fetched or merged.
    #[error("Aggregation failed: {0}")]
    AggregationFailure(String),

    /// The reasoning service could not be reached or refused the request.
    #[error("Reasoning service unavailable: {0}")]
    ReasoningUnavailable(String),

    /// The reasoning service answered with text that breaks the decision schema.
    #[error("Malformed reasoning response: {0}")]
    MalformedResponse(String),
}

/// Application-specific error types returned by HTTP handlers.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Bad request error (invalid input).
    BadRequest(String),
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Maps each error variant to an appropriate HTTP status code and JSON body.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::BadRequest(msg) => {
                tracing::debug!("Rejected request: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
