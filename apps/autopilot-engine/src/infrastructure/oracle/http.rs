//! HTTP client for the decision oracle.
//!
//! Posts the cycle context as JSON and decodes the reply. Reasoning services
//! often wrap their JSON in a markdown fence, so a fenced body is accepted.
//! The reply is checked against the oracle contract here, at the boundary:
//! a known regime, confidence in `[0, 1]`, at most three actions, and each
//! action of a known kind with well-formed parameters.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::application::ports::{DecisionOraclePort, OracleError};
use crate::config::OracleSettings;
use crate::domain::decision::{ActionRequest, AiDecision, DecisionRequest, Regime};

/// Wire shape of an oracle reply.
#[derive(Debug, Deserialize)]
struct DecisionResponse {
    regime: Regime,
    confidence: f64,
    #[serde(default)]
    rationale: String,
    #[serde(default)]
    actions: Vec<Value>,
}

/// Decision oracle reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDecisionOracle {
    client: Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl HttpDecisionOracle {
    /// Build a client from settings.
    pub fn new(settings: &OracleSettings) -> Result<Self, OracleError> {
        let timeout = Duration::from_secs(settings.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.trim().to_string(),
            api_key: settings.api_key.clone(),
            timeout,
        })
    }

    /// Whether an endpoint is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty()
    }

    fn map_transport_error(&self, err: &reqwest::Error) -> OracleError {
        if err.is_timeout() {
            OracleError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            OracleError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl DecisionOraclePort for HttpDecisionOracle {
    async fn request_decision(&self, request: &DecisionRequest) -> Result<AiDecision, OracleError> {
        if !self.is_configured() {
            return Err(OracleError::Request("no oracle endpoint configured".to_string()));
        }

        let mut builder = self.client.post(&self.endpoint).json(request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        if !status.is_success() {
            return Err(OracleError::Request(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate(&body, 200)
            )));
        }

        let decision = parse_decision(&body, request)?;
        tracing::debug!(
            decision_id = %decision.id(),
            regime = %decision.regime(),
            confidence = decision.confidence(),
            actions = decision.actions().len(),
            "Oracle decision received"
        );
        Ok(decision)
    }
}

/// Decode and validate an oracle reply.
fn parse_decision(body: &str, request: &DecisionRequest) -> Result<AiDecision, OracleError> {
    let json = extract_json(body);
    let response: DecisionResponse = serde_json::from_str(json)
        .map_err(|e| OracleError::InvalidResponse(format!("malformed decision: {e}")))?;

    let actions = response
        .actions
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            serde_json::from_value::<ActionRequest>(raw)
                .map_err(|e| OracleError::InvalidResponse(format!("action {i}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    AiDecision::new(
        response.regime,
        response.confidence,
        response.rationale,
        actions,
        request.mode,
    )
    .map_err(|e| OracleError::InvalidResponse(e.to_string()))
}

/// Strip a markdown code fence (optionally tagged `json`) around the body.
fn extract_json(body: &str) -> &str {
    let trimmed = body.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after_fence = &trimmed[start + 3..];
    let content = after_fence.strip_prefix("json").unwrap_or(after_fence);
    match content.find("```") {
        Some(end) => content[..end].trim(),
        None => trimmed,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
