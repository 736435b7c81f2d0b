//! Orchestrator Service
//!
//! Drives the decision cycle on a fixed interval:
//!
//! 1. Skip the cycle while a circuit breaker pause is in force, or when a
//!    breaker trips before the oracle is asked
//! 2. Gather context (portfolio, market, news, mode-scaled limits)
//! 3. Request a decision from the oracle
//! 4. Persist the decision
//! 5. Validate each action, then execute it unless in shadow mode
//! 6. Emit a cycle summary
//!
//! At most one cycle is in flight at any time. The run loop runs cycles
//! sequentially, and manual triggers that find a cycle in flight fail with
//! [`OrchestratorError::CycleInFlight`].
//!
//! Oracle, context and persistence calls are bounded by the call timeout.
//! Executions are not: an order that was handed to the executor runs to
//! completion.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::application::ports::{
    ActionExecutor, ActionValidator, DecisionOraclePort, MarketDataPort, OracleError,
    PolicyViolationRecord, StoragePort,
};
use crate::domain::decision::{
    ActionRequest, AiDecision, AssetStatus, DecisionRequest, MarketConditions, Mode, ModeParseError,
    PortfolioSnapshot, RiskLimits,
};
use crate::domain::policy::{BreakerAction, CircuitBreakerEvent, ValidationResult};
use crate::domain::shared::{CycleId, DecisionId, Symbol};
use crate::error::ErrorCode;
use crate::execution::{ExecutionRequest, PriceFailover};
use crate::observability;
use crate::safety::KillSwitch;

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Time between cycle starts.
    pub interval: Duration,
    /// Deadline of each oracle, context and persistence call.
    pub call_timeout: Duration,
    /// How far back news is read.
    pub news_window: Duration,
    /// Asset market conditions are read from.
    pub reference_symbol: Symbol,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
            call_timeout: Duration::from_secs(60),
            news_window: Duration::from_secs(60 * 60),
            reference_symbol: Symbol::new("BTCUSDT"),
        }
    }
}

/// Collaborators the orchestrator drives.
pub struct OrchestratorPorts {
    /// Decision oracle.
    pub oracle: Arc<dyn DecisionOraclePort>,
    /// Policy validator.
    pub validator: Arc<dyn ActionValidator>,
    /// Action executor.
    pub executor: Arc<dyn ActionExecutor>,
    /// Storage.
    pub storage: Arc<dyn StoragePort>,
    /// Market data.
    pub market_data: Arc<dyn MarketDataPort>,
}

/// Clears the running flag when the run loop task ends, however it ends.
struct RunningFlag<'a>(&'a AtomicBool);

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Orchestrator errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Run loop already started.
    #[error("orchestrator is already running")]
    AlreadyRunning,

    /// Another cycle holds the single-flight guard.
    #[error("a decision cycle is already in flight")]
    CycleInFlight,

    /// Oracle failed; the cycle was aborted.
    #[error("decision cycle aborted: {0}")]
    Oracle(#[from] OracleError),

    /// Rejected mode string.
    #[error(transparent)]
    InvalidMode(#[from] ModeParseError),
}

impl OrchestratorError {
    /// Stable tag for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::AlreadyRunning => ErrorCode::AlreadyRunning,
            Self::CycleInFlight => ErrorCode::CycleInFlight,
            Self::Oracle(_) => ErrorCode::OracleUnavailable,
            Self::InvalidMode(_) => ErrorCode::InvalidMode,
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleStatus {
    /// Ran to the end.
    Completed,
    /// Skipped because a circuit breaker pause is in force.
    SkippedCircuitBreaker {
        /// End of the pause window.
        paused_until: DateTime<Utc>,
    },
}

/// Summary of one decision cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Cycle identifier.
    pub cycle_id: CycleId,
    /// Mode the cycle ran in.
    pub mode: Mode,
    /// Outcome.
    #[serde(flatten)]
    pub status: CycleStatus,
    /// Decision the cycle acted on.
    pub decision_id: Option<DecisionId>,
    /// Actions proposed.
    pub total: usize,
    /// Actions the policy approved.
    pub approved: usize,
    /// Actions executed successfully.
    pub executed: usize,
    /// Actions that failed validation or execution.
    pub failed: usize,
    /// Actions the policy rejected.
    pub rejected: usize,
}

impl CycleReport {
    const fn new(cycle_id: CycleId, mode: Mode, status: CycleStatus) -> Self {
        Self {
            cycle_id,
            mode,
            status,
            decision_id: None,
            total: 0,
            approved: 0,
            executed: 0,
            failed: 0,
            rejected: 0,
        }
    }

    fn status_label(&self) -> &'static str {
        match self.status {
            CycleStatus::Completed => "completed",
            CycleStatus::SkippedCircuitBreaker { .. } => "skipped_circuit_breaker",
        }
    }
}

/// Decision loop orchestrator.
pub struct Orchestrator {
    ports: OrchestratorPorts,
    prices: Arc<PriceFailover>,
    kill_switch: Arc<KillSwitch>,
    config: OrchestratorConfig,
    mode: RwLock<Mode>,
    active_breaker: RwLock<Option<CircuitBreakerEvent>>,
    cycle_lock: tokio::sync::Mutex<()>,
    running: AtomicBool,
    stop_token: Mutex<Option<CancellationToken>>,
}

impl Orchestrator {
    /// Create an orchestrator in `mode`.
    #[must_use]
    pub fn new(
        ports: OrchestratorPorts,
        prices: Arc<PriceFailover>,
        kill_switch: Arc<KillSwitch>,
        config: OrchestratorConfig,
        mode: Mode,
    ) -> Self {
        Self {
            ports,
            prices,
            kill_switch,
            config,
            mode: RwLock::new(mode),
            active_breaker: RwLock::new(None),
            cycle_lock: tokio::sync::Mutex::new(()),
            running: AtomicBool::new(false),
            stop_token: Mutex::new(None),
        }
    }

    /// Start the run loop.
    ///
    /// The first cycle starts immediately, then one per interval. Ticks that
    /// fall inside an overrunning cycle are skipped. Cancelling `shutdown`
    /// (or calling [`Self::stop`]) lets the in-flight cycle finish, then ends
    /// the loop.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::AlreadyRunning`] if the loop is running.
    pub fn start(self: &Arc<Self>, shutdown: &CancellationToken) -> Result<JoinHandle<()>, OrchestratorError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(OrchestratorError::AlreadyRunning);
        }

        let token = shutdown.child_token();
        *self.stop_token.lock() = Some(token.clone());
        let this = Arc::clone(self);

        tracing::info!(
            interval_secs = this.config.interval.as_secs(),
            mode = %this.mode(),
            "Starting orchestrator"
        );

        Ok(tokio::spawn(async move {
            let _running = RunningFlag(&this.running);
            let mut ticker = tokio::time::interval(this.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = ticker.tick() => this.run_isolated_cycle().await,
                }
            }

            tracing::info!("Orchestrator stopped");
        }))
    }

    /// Run one scheduled cycle on its own task so a panic ends only that cycle.
    async fn run_isolated_cycle(self: &Arc<Self>) {
        let started = Instant::now();
        let this = Arc::clone(self);
        match tokio::spawn(async move { this.run_cycle().await }).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::error!(code = ?e.code(), error = %e, "Decision cycle failed");
            }
            Err(e) => {
                observability::record_cycle("panicked", started.elapsed().as_secs_f64());
                tracing::error!(error = %e, "Decision cycle panicked, run loop continues");
            }
        }
    }

    /// Ask the run loop to stop after the in-flight cycle.
    pub fn stop(&self) {
        if let Some(token) = self.stop_token.lock().take() {
            token.cancel();
        }
    }

    /// Whether the run loop is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        *self.mode.read()
    }

    /// Change the mode. Takes effect on the next cycle.
    pub fn set_mode(&self, mode: Mode) {
        let previous = std::mem::replace(&mut *self.mode.write(), mode);
        if previous != mode {
            tracing::warn!(from = %previous, to = %mode, "Mode changed");
        }
    }

    /// Parse and apply a mode string.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidMode`] for unknown strings; the
    /// mode is left unchanged.
    pub fn set_mode_str(&self, raw: &str) -> Result<Mode, OrchestratorError> {
        let mode = raw.parse::<Mode>()?;
        self.set_mode(mode);
        Ok(mode)
    }

    /// Last circuit breaker event still awaiting resume.
    #[must_use]
    pub fn active_circuit_breaker(&self) -> Option<CircuitBreakerEvent> {
        self.active_breaker.read().clone()
    }

    /// The policy validator.
    #[must_use]
    pub fn validator(&self) -> &Arc<dyn ActionValidator> {
        &self.ports.validator
    }

    /// Run one decision cycle now.
    ///
    /// # Errors
    ///
    /// - [`OrchestratorError::CycleInFlight`] if another cycle is running
    /// - [`OrchestratorError::Oracle`] if no decision could be obtained
    pub async fn run_cycle(&self) -> Result<CycleReport, OrchestratorError> {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            tracing::warn!("Decision cycle already in flight, not starting another");
            return Err(OrchestratorError::CycleInFlight);
        };

        let cycle_id = CycleId::generate();
        let mode = self.mode();
        let span = tracing::info_span!("decision_cycle", cycle_id = %cycle_id, mode = %mode);
        let started = Instant::now();

        let result = self.cycle(cycle_id, mode).instrument(span).await;

        let status = match &result {
            Ok(report) => report.status_label(),
            Err(_) => "aborted",
        };
        observability::record_cycle(status, started.elapsed().as_secs_f64());
        result
    }

    async fn cycle(&self, cycle_id: CycleId, mode: Mode) -> Result<CycleReport, OrchestratorError> {
        let now = Utc::now();
        if let Some(paused_until) = self.breaker_pause(now).await {
            tracing::info!(%paused_until, "Circuit breaker active, skipping cycle");
            return Ok(CycleReport::new(
                cycle_id,
                mode,
                CycleStatus::SkippedCircuitBreaker { paused_until },
            ));
        }

        if let Some(paused_until) = self.pre_cycle_breaker().await {
            return Ok(CycleReport::new(
                cycle_id,
                mode,
                CycleStatus::SkippedCircuitBreaker { paused_until },
            ));
        }

        tracing::info!("Starting decision cycle");
        let request = self.gather_context(mode).await;

        let decision = self.request_decision(&request).await?;
        tracing::info!(
            decision_id = %decision.id(),
            regime = %decision.regime(),
            confidence = decision.confidence(),
            actions = decision.actions().len(),
            rationale = decision.rationale(),
            "Decision received"
        );
        self.persist("decision", self.ports.storage.save_decision(&decision))
            .await;

        let mut report = CycleReport::new(cycle_id, mode, CycleStatus::Completed);
        report.decision_id = Some(decision.id().clone());
        report.total = decision.actions().len();

        self.process_actions(&decision, mode, &mut report).await;

        tracing::info!(
            total = report.total,
            approved = report.approved,
            executed = report.executed,
            failed = report.failed,
            rejected = report.rejected,
            "Decision cycle complete: {}/{} actions approved",
            report.approved,
            report.total
        );
        Ok(report)
    }

    /// Returns the end of the pause if a breaker still blocks at `now`.
    /// Resumes and persists the breaker once its window has elapsed.
    async fn breaker_pause(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let resumed = {
            let mut active = self.active_breaker.write();
            match active.as_ref() {
                None => return None,
                Some(event) if !event.window_elapsed(now) => return Some(event.paused_until),
                Some(_) => {}
            }
            active.take().map(|mut event| {
                event.resume(now);
                event
            })
        };

        if let Some(event) = resumed {
            tracing::info!(
                breaker = event.kind.as_str(),
                triggered_at = %event.triggered_at,
                "Circuit breaker window elapsed, resuming"
            );
            self.persist(
                "circuit_breaker_event",
                self.ports.storage.save_circuit_breaker_event(&event),
            )
            .await;
        }
        None
    }

    /// Trip a breaker before the oracle is asked, so a decision without
    /// actions cannot hide one. Returns the end of the new pause.
    async fn pre_cycle_breaker(&self) -> Option<DateTime<Utc>> {
        match self.bounded(self.ports.validator.check_circuit_breakers()).await {
            Ok(Some(event)) => {
                let paused_until = event.paused_until;
                self.trip_breaker(event).await;
                Some(paused_until)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Circuit breaker check failed, actions will be validated individually");
                None
            }
        }
    }

    async fn trip_breaker(&self, event: CircuitBreakerEvent) {
        observability::record_circuit_breaker_trip(event.kind.as_str());
        tracing::error!(
            breaker = event.kind.as_str(),
            action = ?event.action,
            reason = %event.reason,
            paused_until = %event.paused_until,
            "Circuit breaker triggered, pausing decision cycles"
        );
        self.persist(
            "circuit_breaker_event",
            self.ports.storage.save_circuit_breaker_event(&event),
        )
        .await;

        match event.action {
            BreakerAction::Pause => {}
            BreakerAction::Conservative => {
                if self.mode() == Mode::Full {
                    self.set_mode(Mode::Pilot);
                }
            }
            BreakerAction::KillSwitch => {
                self.kill_switch
                    .activate(format!("circuit breaker: {}", event.reason));
            }
        }

        *self.active_breaker.write() = Some(event);
    }

    async fn gather_context(&self, mode: Mode) -> DecisionRequest {
        let now = Utc::now();
        let storage = &self.ports.storage;

        let balances = self
            .bounded(storage.balances())
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Balances unavailable, using empty portfolio");
                Vec::new()
            });

        let mut assets = Vec::with_capacity(balances.len());
        for balance in balances {
            match self.bounded(self.prices.get_price(&balance.symbol)).await {
                Ok(price) => assets.push(AssetStatus::valued(
                    balance.symbol,
                    balance.quantity,
                    balance.avg_entry_price,
                    balance.total_invested,
                    price,
                )),
                Err(e) => {
                    tracing::warn!(symbol = %balance.symbol, error = %e, "Skipping asset without price");
                }
            }
        }

        let mut market_conditions = self
            .bounded(self.ports.market_data.market_conditions())
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Market conditions unavailable");
                MarketConditions::unavailable(self.config.reference_symbol.clone())
            });
        if market_conditions.reference_price.is_none() {
            market_conditions.reference_price = self
                .bounded(self.prices.get_price(&market_conditions.reference_symbol))
                .await
                .ok();
        }

        let news_since = now
            - chrono::Duration::from_std(self.config.news_window)
                .unwrap_or_else(|_| chrono::Duration::hours(1));
        let recent_news = self
            .bounded(self.ports.market_data.recent_news(news_since))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "News unavailable");
                Vec::new()
            });

        let tradable_symbols = self
            .bounded(storage.enabled_assets())
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Enabled assets unavailable");
                Vec::new()
            });

        DecisionRequest {
            current_portfolio: PortfolioSnapshot::from_assets(assets),
            market_conditions,
            recent_news,
            risk_limits: RiskLimits::for_mode(self.ports.validator.policy(), mode),
            mode,
            tradable_symbols,
        }
    }

    async fn request_decision(&self, request: &DecisionRequest) -> Result<AiDecision, OracleError> {
        let timeout = self.config.call_timeout;
        let result = tokio::time::timeout(timeout, self.ports.oracle.request_decision(request))
            .await
            .unwrap_or(Err(OracleError::Timeout {
                seconds: timeout.as_secs(),
            }));

        if let Err(e) = &result {
            tracing::error!(error = %e, "Oracle request failed, aborting cycle");
        }
        result
    }

    async fn process_actions(&self, decision: &AiDecision, mode: Mode, report: &mut CycleReport) {
        for action in decision.actions() {
            let validation = match self
                .bounded(self.ports.validator.validate_action(action, Some(decision.id())))
                .await
            {
                Ok(validation) => validation,
                Err(e) => {
                    report.failed += 1;
                    observability::record_action_outcome("failed");
                    tracing::error!(action = %action, error = %e, "Validation failed, skipping action");
                    continue;
                }
            };

            if !validation.approved {
                report.rejected += 1;
                observability::record_action_outcome("rejected");
                tracing::warn!(
                    action = %action,
                    risk_score = validation.risk_score,
                    violations = %validation.violation_summary(),
                    "Action rejected by policy"
                );
                if let Some(event) = validation.circuit_breaker {
                    self.trip_breaker(event).await;
                    break;
                }
                self.persist_warnings(decision.id(), action, &validation).await;
                continue;
            }

            report.approved += 1;
            if !mode.executes() {
                observability::record_action_outcome("shadow");
                tracing::info!(
                    action = %action,
                    risk_score = validation.risk_score,
                    "Shadow mode: would execute"
                );
                continue;
            }

            let request = ExecutionRequest::new(action.clone()).with_decision(decision.id().clone());
            let result = self.ports.executor.execute(request).await;
            if result.success {
                report.executed += 1;
                observability::record_action_outcome("executed");
            } else {
                report.failed += 1;
                observability::record_action_outcome("failed");
                if let Some(err) = &result.error {
                    tracing::warn!(action = %action, code = ?err.code(), error = %err, "Execution failed");
                }
            }
        }
    }

    /// Critical violations are persisted by the validator; record the rest.
    async fn persist_warnings(
        &self,
        decision_id: &DecisionId,
        action: &ActionRequest,
        validation: &ValidationResult,
    ) {
        for violation in validation.warnings() {
            let record = PolicyViolationRecord::new(
                Some(decision_id.clone()),
                action.kind(),
                action.symbol().clone(),
                violation.clone(),
            );
            self.persist("policy_violation", self.ports.storage.save_policy_violation(&record))
                .await;
        }
    }

    async fn persist<E: Display>(&self, record: &'static str, write: impl Future<Output = Result<(), E>>) {
        if let Err(e) = self.bounded(write).await {
            observability::record_persistence_failure(record);
            tracing::error!(record, error = %e, "Persistence failed, continuing");
        }
    }

    async fn bounded<T, E: Display>(&self, call: impl Future<Output = Result<T, E>>) -> Result<T, String> {
        match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "timed out after {}s",
                self.config.call_timeout.as_secs()
            )),
        }
    }

    #[cfg(test)]
    fn set_active_breaker(&self, event: CircuitBreakerEvent) {
        *self.active_breaker.write() = Some(event);
    }
}
