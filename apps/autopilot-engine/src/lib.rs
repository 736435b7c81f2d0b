// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Autopilot Engine - Rust Core Library
//!
//! Autonomous spot trading control loop: an orchestrator asks a reasoning
//! oracle for decisions on a fixed interval, a policy engine validates every
//! proposed action against the active risk profile, and an executor places
//! approved orders behind the kill switch, price and slippage gates.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic
//!   - `policy`: Risk profiles, circuit breakers, violations, risk score
//!   - `decision`: Oracle decisions, typed actions, run mode
//!   - `portfolio`: Balance and trade read models
//!
//! - **Application**: Ports and services
//!   - `ports`: Exchange, price source, storage, oracle, market data
//!   - `services`: `PolicyEngine`, `Orchestrator`
//!
//! - **Execution**: `Executor`, `PriceFailover`, `SlippageGuard`
//!
//! - **Safety**: `KillSwitch`
//!
//! - **Infrastructure**: Adapters
//!   - `persistence`: In-memory storage
//!   - `exchange`: Paper exchange
//!   - `market_data`: Static market data
//!   - `oracle`: HTTP decision oracle
//!   - `http`: Control API

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Services and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting Modules
// =============================================================================

/// YAML configuration and policy profile loading.
pub mod config;

/// Error codes and API error framing.
pub mod error;

/// Order execution behind the safety gates.
pub mod execution;

/// Structured logging and Prometheus metrics.
pub mod observability;

/// Kill switch.
pub mod safety;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::decision::{ActionKind, ActionRequest, AiDecision, Mode, Regime};
pub use domain::policy::{CircuitBreakerEvent, Policy, PolicyLimits, RiskMetrics, ValidationResult};
pub use domain::shared::{OrderId, OrderSide, Symbol};

// Application re-exports
pub use application::ports::{
    ActionExecutor, ActionValidator, DecisionOraclePort, ExchangePort, MarketDataPort,
    PriceSourcePort, StoragePort,
};
pub use application::services::{CycleReport, Orchestrator, OrchestratorConfig, PolicyEngine};

// Execution and safety re-exports
pub use error::{ApiError, ErrorCode};
pub use execution::{ExecutionError, Executor, PriceFailover, SlippageGuard};
pub use safety::KillSwitch;

// Infrastructure re-exports
pub use infrastructure::http::{AppState, create_router};
pub use infrastructure::oracle::HttpDecisionOracle;
