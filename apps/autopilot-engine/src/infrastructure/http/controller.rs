//! HTTP Controller (Driver Adapter)
//!
//! Axum-based control API over the orchestrator and its safety controls.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use crate::application::services::{Orchestrator, OrchestratorError};
use crate::domain::policy::risk_score;
use crate::error::{ApiError, ErrorCode};
use crate::execution::{SlippageError, SlippageGuard};
use crate::safety::KillSwitch;

use super::request::{ActivateKillSwitchRequest, SetModeRequest, SetSlippageThresholdRequest};
use super::response::{
    CircuitBreakerResponse, HealthResponse, MetricsResponse, ModeResponse,
    SlippageThresholdResponse,
};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The decision loop.
    pub orchestrator: Arc<Orchestrator>,
    /// Shared kill switch.
    pub kill_switch: Arc<KillSwitch>,
    /// Shared slippage guard.
    pub slippage: Arc<SlippageGuard>,
    /// Application version.
    pub version: String,
}

/// Create the HTTP router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/mode", get(get_mode).put(set_mode))
        .route("/api/v1/kill-switch", get(kill_switch_status))
        .route("/api/v1/kill-switch/activate", post(activate_kill_switch))
        .route("/api/v1/kill-switch/deactivate", post(deactivate_kill_switch))
        .route("/api/v1/policy", get(get_policy))
        .route("/api/v1/metrics", get(get_metrics))
        .route("/api/v1/circuit-breaker", get(circuit_breaker_status))
        .route(
            "/api/v1/slippage-threshold",
            get(get_slippage_threshold).put(set_slippage_threshold),
        )
        .route("/api/v1/cycles", post(run_cycle))
        .with_state(state)
}

fn orchestrator_error(err: &OrchestratorError) -> ApiError {
    ApiError::new(err.code(), err.to_string())
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        orchestrator_running: state.orchestrator.is_running(),
        kill_switch_active: state.kill_switch.is_active(),
    })
}

async fn get_mode(State(state): State<AppState>) -> impl IntoResponse {
    Json(ModeResponse {
        mode: state.orchestrator.mode(),
        running: state.orchestrator.is_running(),
    })
}

async fn set_mode(
    State(state): State<AppState>,
    Json(request): Json<SetModeRequest>,
) -> Result<Json<ModeResponse>, ApiError> {
    let mode = state
        .orchestrator
        .set_mode_str(&request.mode)
        .map_err(|e| orchestrator_error(&e).with_context("mode", request.mode.clone()))?;

    Ok(Json(ModeResponse {
        mode,
        running: state.orchestrator.is_running(),
    }))
}

async fn kill_switch_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.kill_switch.status())
}

async fn activate_kill_switch(
    State(state): State<AppState>,
    request: Option<Json<ActivateKillSwitchRequest>>,
) -> impl IntoResponse {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    state.kill_switch.activate(request.reason_or_default());
    Json(state.kill_switch.status())
}

async fn deactivate_kill_switch(State(state): State<AppState>) -> impl IntoResponse {
    state.kill_switch.deactivate();
    Json(state.kill_switch.status())
}

async fn get_policy(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.orchestrator.validator().policy().clone())
}

async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let validator = state.orchestrator.validator();
    let policy = validator.policy();
    let metrics = validator.metrics();
    let score = risk_score(
        metrics.total_exposure,
        policy.max_total_exposure(),
        metrics.current_drawdown,
        metrics.daily_loss,
        policy.max_daily_loss_usdt(),
    );
    Json(MetricsResponse {
        metrics,
        risk_score: score,
    })
}

async fn circuit_breaker_status(State(state): State<AppState>) -> impl IntoResponse {
    let event = state.orchestrator.active_circuit_breaker();
    let active = event.as_ref().is_some_and(|e| e.is_blocking(Utc::now()));
    Json(CircuitBreakerResponse { active, event })
}

async fn get_slippage_threshold(State(state): State<AppState>) -> impl IntoResponse {
    Json(SlippageThresholdResponse {
        threshold: state.slippage.threshold(),
    })
}

async fn set_slippage_threshold(
    State(state): State<AppState>,
    Json(request): Json<SetSlippageThresholdRequest>,
) -> Result<Json<SlippageThresholdResponse>, ApiError> {
    state
        .slippage
        .set_threshold(request.threshold)
        .map_err(|e: SlippageError| {
            ApiError::invalid_request(e.to_string())
                .with_context("threshold", request.threshold.to_string())
        })?;

    Ok(Json(SlippageThresholdResponse {
        threshold: state.slippage.threshold(),
    }))
}

async fn run_cycle(State(state): State<AppState>) -> impl IntoResponse {
    match state.orchestrator.run_cycle().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            let error = orchestrator_error(&e);
            if error.code() == ErrorCode::OracleUnavailable {
                tracing::warn!(error = %e, "Manual decision cycle aborted");
            }
            error.into_response()
        }
    }
}
