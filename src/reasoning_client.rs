use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::ReasoningConfig;
use crate::errors::PipelineError;
use crate::prompt::RequestPayload;
use crate::upstream_models::ReasoningResponse;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One-shot access to the external reasoning service.
///
/// Implementations make exactly one request per call: no retries, no streaming.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// Send `payload` and return the raw text of the answer.
    async fn invoke(&self, payload: &RequestPayload) -> Result<String, PipelineError>;
}

/// Client for an Anthropic Messages API compatible endpoint.
#[derive(Clone)]
pub struct AnthropicReasoningClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl AnthropicReasoningClient {
    pub fn new(client: Client, config: &ReasoningConfig, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            timeout,
        }
    }
}

#[async_trait]
impl ReasoningClient for AnthropicReasoningClient {
    async fn invoke(&self, payload: &RequestPayload) -> Result<String, PipelineError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            PipelineError::ReasoningUnavailable("no reasoning credentials configured".to_string())
        })?;

        tracing::info!(
            "Requesting decision from {} (model {}, max_tokens {})",
            self.endpoint,
            payload.model,
            payload.max_tokens
        );

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload.to_request_body())
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("request timed out after {:?}", self.timeout)
                } else {
                    format!("request failed: {}", e)
                };
                PipelineError::ReasoningUnavailable(reason)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::ReasoningUnavailable(format!(
                "service returned status {}: {}",
                status, error_text
            )));
        }

        let body: ReasoningResponse = response.json().await.map_err(|e| {
            PipelineError::MalformedResponse(format!("Failed to parse reasoning envelope: {}", e))
        })?;

        let text = body.first_text().ok_or_else(|| {
            PipelineError::MalformedResponse("reasoning response has no text content".to_string())
        })?;

        tracing::debug!("Reasoning service answered with {} bytes", text.len());
        Ok(text.trim().to_string())
    }
}
