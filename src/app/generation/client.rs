use crate::app::generation::{candidates, wire};
use crate::config::toml_config::GenerationConfig;
use crate::domain::model::{
    GenerationBatch, GenerationRequest, MAX_REQUESTED_COUNT, MIN_REQUESTED_COUNT,
};
use crate::domain::ports::CardGenerator;
use crate::utils::error::{CardError, CommunicationFailure, Result};
use crate::utils::validation::validate_range;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Issues one request to the external generation service per call and turns
/// the reply into validated candidates. Never retries.
pub struct GenerationClient {
    client: Client,
    config: GenerationConfig,
}

impl GenerationClient {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cardwise/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CardError::ConfigError {
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generates with the configured timeout as the deadline.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationBatch> {
        let deadline = Instant::now() + self.config.timeout();
        self.generate_until(request, deadline, cancel).await
    }

    async fn generate_until(
        &self,
        request: &GenerationRequest,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<GenerationBatch> {
        check_outbound(request)?;

        let api_key = request
            .model_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .or_else(|| self.config.api_key())
            .ok_or_else(|| CardError::AuthenticationError {
                message: "no model API key configured".to_string(),
            })?;

        let body = wire::build_body(self.config.wire_format, &self.config.model, request)?;

        tracing::info!(
            "Requesting {} flashcards from {} ({} chars of source)",
            request.requested_count,
            self.config.model,
            request.source_text.chars().count()
        );

        // dropping the send future on cancel or timeout aborts the HTTP request
        let raw = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Generation request cancelled by caller");
                return Err(CardError::Cancelled);
            }
            outcome = tokio::time::timeout_at(deadline.into(), self.send(api_key, &body)) => {
                outcome.map_err(|_| CardError::communication(CommunicationFailure::Timeout))??
            }
        };

        let items = wire::extract_items(self.config.wire_format, &raw)?;
        let batch = candidates::validate_items(items, request.requested_count)?;

        tracing::info!(
            "Generated {} candidates ({} dropped)",
            batch.candidates.len(),
            batch.dropped_count
        );
        Ok(batch)
    }

    async fn send(&self, api_key: &str, body: &serde_json::Value) -> Result<String> {
        let mut request = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(body);

        if let Some(headers) = &self.config.headers {
            for (key, value) in headers {
                request = request.header(key, value);
            }
        }

        tracing::debug!("Making generation request to: {}", self.config.endpoint);
        let response = request.send().await.map_err(transport_failure)?;
        let status = response.status();
        tracing::debug!("Generation response status: {}", status);

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let detail = response.text().await.unwrap_or_default();
            return Err(CardError::AuthenticationError {
                message: format!("HTTP {}: {}", status.as_u16(), detail.trim()),
            });
        }

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(
                "Generation service returned HTTP {}: {}",
                status.as_u16(),
                detail.trim()
            );
            return Err(CardError::communication(CommunicationFailure::Status(
                status.as_u16(),
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_json_content_type(&content_type) {
            return Err(CardError::validation(format!(
                "expected a JSON response, got content type '{}'",
                content_type
            )));
        }

        response.text().await.map_err(transport_failure)
    }
}

#[async_trait]
impl CardGenerator for GenerationClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<GenerationBatch> {
        self.generate_until(request, deadline, cancel).await
    }
}

// Source text arrives already escaped, so only emptiness is checked here.
fn check_outbound(request: &GenerationRequest) -> Result<()> {
    validate_range(
        "requested_count",
        request.requested_count,
        MIN_REQUESTED_COUNT,
        MAX_REQUESTED_COUNT,
    )
    .map_err(|e| CardError::validation(e.to_string()))?;
    if request.source_text.trim().is_empty() {
        return Err(CardError::validation("source text is empty"));
    }
    Ok(())
}

fn transport_failure(error: reqwest::Error) -> CardError {
    if error.is_timeout() {
        CardError::communication(CommunicationFailure::Timeout)
    } else {
        CardError::communication(CommunicationFailure::Network(error.to_string()))
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || mime.ends_with("+json")
}
