//! Decision Cycle Integration Tests
//!
//! Runs full cycles through the real stack: the HTTP oracle client against a
//! mock oracle server, the policy engine, the executor and the paper
//! exchange, with the in-memory ledger underneath.
//!
//! Oracle replies are loaded from fixtures:
//! - Accumulation with one oversized and one in-limit buy
//! - Defensive hold wrapped in a markdown fence

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use autopilot_engine::application::ports::ExchangePriceSource;
use autopilot_engine::application::services::{
    CycleStatus, Orchestrator, OrchestratorConfig, OrchestratorError, OrchestratorPorts,
};
use autopilot_engine::config::OracleSettings;
use autopilot_engine::domain::decision::MarketConditions;
use autopilot_engine::domain::policy::{CircuitBreakerKind, PolicyLimits, ViolationKind};
use autopilot_engine::infrastructure::exchange::PaperExchange;
use autopilot_engine::infrastructure::market_data::StaticMarketData;
use autopilot_engine::infrastructure::persistence::InMemoryStorage;
use autopilot_engine::{
    ExchangePort, Executor, HttpDecisionOracle, KillSwitch, Mode, Policy, PolicyEngine,
    PriceFailover, SlippageGuard, Symbol,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Load an oracle reply fixture.
fn load_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/fixtures");
    path.push(name);

    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {e}", path.display()))
}

/// Everything a cycle touches, wired the way the binary wires it.
struct Stack {
    server: MockServer,
    storage: Arc<InMemoryStorage>,
    market: Arc<StaticMarketData>,
    exchange: Arc<PaperExchange>,
    kill_switch: Arc<KillSwitch>,
    orchestrator: Arc<Orchestrator>,
}

impl Stack {
    async fn start(mode: Mode) -> Self {
        let server = MockServer::start().await;

        let storage = Arc::new(InMemoryStorage::new());
        storage.set_enabled_assets(vec![Symbol::new("BTCUSDT")]);
        let market = Arc::new(StaticMarketData::new(MarketConditions::unavailable(
            Symbol::new("BTCUSDT"),
        )));
        let exchange = Arc::new(
            PaperExchange::new(dec!(1000))
                .with_price("BTCUSDT", dec!(50000))
                .with_ledger(Arc::clone(&storage)),
        );
        let prices = Arc::new(PriceFailover::new(Arc::new(ExchangePriceSource::new(
            "paper",
            Arc::clone(&exchange),
        ))));
        let kill_switch = Arc::new(KillSwitch::new());

        let policy = Policy::new("balanced", PolicyLimits::balanced()).unwrap();
        let slippage = Arc::new(SlippageGuard::new(policy.slippage_threshold()));
        let validator = Arc::new(PolicyEngine::new(
            policy,
            Arc::clone(&storage),
            Arc::clone(&market),
        ));
        let executor = Arc::new(Executor::new(
            Arc::clone(&exchange),
            Arc::clone(&validator),
            Arc::clone(&kill_switch),
            Arc::clone(&prices),
            slippage,
        ));

        let oracle = HttpDecisionOracle::new(&OracleSettings {
            endpoint: format!("{}/v1/decide", server.uri()),
            api_key: "test-key".to_string(),
            timeout_secs: 5,
        })
        .unwrap();

        let orchestrator = Arc::new(Orchestrator::new(
            OrchestratorPorts {
                oracle: Arc::new(oracle),
                validator,
                executor,
                storage: Arc::clone(&storage) as _,
                market_data: Arc::clone(&market) as _,
            },
            prices,
            Arc::clone(&kill_switch),
            OrchestratorConfig {
                call_timeout: Duration::from_secs(5),
                ..OrchestratorConfig::default()
            },
            mode,
        ));

        Self {
            server,
            storage,
            market,
            exchange,
            kill_switch,
            orchestrator,
        }
    }

    async fn reply_with(&self, body: String) {
        Mock::given(method("POST"))
            .and(path("/v1/decide"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    async fn quote_balance(&self) -> Decimal {
        self.exchange.get_balance("USDT").await.unwrap()
    }

    async fn oracle_calls(&self) -> usize {
        self.server.received_requests().await.unwrap_or_default().len()
    }
}

// ============================================
// Mode Behavior
// ============================================

#[tokio::test]
async fn test_full_mode_fills_approved_buy_and_records_rejection() {
    let stack = Stack::start(Mode::Full).await;
    stack.reply_with(load_fixture("accumulate_two_buys.json")).await;

    let report = stack.orchestrator.run_cycle().await.unwrap();

    assert_eq!(report.status, CycleStatus::Completed);
    assert_eq!(report.total, 2);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.approved, 1);
    assert_eq!(report.executed, 1);
    assert_eq!(report.failed, 0);

    assert_eq!(stack.quote_balance().await, dec!(950));
    assert_eq!(stack.exchange.get_balance("BTC").await.unwrap(), dec!(0.001));

    let decisions = stack.storage.decisions();
    assert_eq!(decisions.len(), 1);
    assert_eq!(Some(decisions[0].id().clone()), report.decision_id);

    let violations = stack.storage.violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].violation.kind, ViolationKind::OrderSize);
    assert_eq!(violations[0].decision_id, report.decision_id);
}

#[tokio::test]
async fn test_shadow_mode_leaves_exchange_untouched() {
    let stack = Stack::start(Mode::Shadow).await;
    stack.reply_with(load_fixture("accumulate_two_buys.json")).await;

    let report = stack.orchestrator.run_cycle().await.unwrap();

    assert_eq!(report.approved, 1);
    assert_eq!(report.executed, 0);
    assert_eq!(stack.quote_balance().await, dec!(1000));
    assert_eq!(stack.storage.decisions().len(), 1);
}

#[tokio::test]
async fn test_pilot_mode_sends_halved_limits_to_oracle() {
    let stack = Stack::start(Mode::Pilot).await;
    stack.reply_with(load_fixture("defense_hold.md")).await;

    let report = stack.orchestrator.run_cycle().await.unwrap();
    assert_eq!(report.total, 0);

    let requests = stack.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["mode"], "pilot");

    let limit = |field: &str| -> Decimal {
        serde_json::from_value(body["risk_limits"][field].clone()).unwrap()
    };
    assert_eq!(limit("max_order_usdt"), dec!(50));
    assert_eq!(limit("max_position_usdt"), dec!(500));
    assert_eq!(limit("max_total_exposure"), dec!(1500));
    assert_eq!(limit("max_daily_loss"), dec!(50));
}

#[tokio::test]
async fn test_mode_change_applies_to_next_cycle() {
    let stack = Stack::start(Mode::Shadow).await;
    stack.reply_with(load_fixture("accumulate_two_buys.json")).await;

    stack.orchestrator.run_cycle().await.unwrap();
    assert_eq!(stack.quote_balance().await, dec!(1000));

    stack.orchestrator.set_mode_str("FULL").unwrap();
    let report = stack.orchestrator.run_cycle().await.unwrap();

    assert_eq!(report.mode, Mode::Full);
    assert_eq!(report.executed, 1);
    assert_eq!(stack.quote_balance().await, dec!(950));
}

// ============================================
// Failure Handling
// ============================================

#[tokio::test]
async fn test_oracle_outage_aborts_cycle_without_persisting() {
    let stack = Stack::start(Mode::Full).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&stack.server)
        .await;

    let result = stack.orchestrator.run_cycle().await;

    assert!(matches!(result, Err(OrchestratorError::Oracle(_))));
    assert!(stack.storage.decisions().is_empty());
    assert_eq!(stack.quote_balance().await, dec!(1000));
}

#[tokio::test]
async fn test_malformed_reply_aborts_cycle() {
    let stack = Stack::start(Mode::Full).await;
    stack
        .reply_with(r#"{"regime": "MOON", "confidence": 0.9, "actions": []}"#.to_string())
        .await;

    let result = stack.orchestrator.run_cycle().await;

    assert!(matches!(result, Err(OrchestratorError::Oracle(_))));
    assert!(stack.storage.decisions().is_empty());
}

#[tokio::test]
async fn test_storage_outage_fails_actions_but_completes_cycle() {
    let stack = Stack::start(Mode::Full).await;
    stack.reply_with(load_fixture("accumulate_two_buys.json")).await;
    stack.storage.set_unavailable(true);

    let report = stack.orchestrator.run_cycle().await.unwrap();

    // Policy metrics read storage, so neither action can be validated.
    assert_eq!(report.status, CycleStatus::Completed);
    assert_eq!(report.total, 2);
    assert_eq!(report.failed, 2);
    assert_eq!(report.executed, 0);
    assert_eq!(stack.quote_balance().await, dec!(1000));

    stack.storage.set_unavailable(false);
    assert!(stack.storage.decisions().is_empty());
}

#[tokio::test]
async fn test_kill_switch_blocks_execution_in_full_mode() {
    let stack = Stack::start(Mode::Full).await;
    stack.reply_with(load_fixture("accumulate_two_buys.json")).await;
    stack.kill_switch.activate("manual halt");

    let report = stack.orchestrator.run_cycle().await.unwrap();

    assert_eq!(report.approved, 1);
    assert_eq!(report.executed, 0);
    assert_eq!(report.failed, 1);
    assert_eq!(stack.quote_balance().await, dec!(1000));
}

// ============================================
// Circuit Breakers
// ============================================

#[tokio::test]
async fn test_volatility_breaker_degrades_full_to_pilot_and_pauses() {
    let stack = Stack::start(Mode::Full).await;
    stack.reply_with(load_fixture("accumulate_two_buys.json")).await;
    stack.market.set_volatility(dec!(9));

    let report = stack.orchestrator.run_cycle().await.unwrap();

    let active = stack.orchestrator.active_circuit_breaker().unwrap();
    assert_eq!(active.kind, CircuitBreakerKind::Volatility);
    assert_eq!(
        report.status,
        CycleStatus::SkippedCircuitBreaker {
            paused_until: active.paused_until
        }
    );
    assert_eq!(report.total, 0);
    assert_eq!(stack.orchestrator.mode(), Mode::Pilot);
    assert_eq!(stack.quote_balance().await, dec!(1000));
    assert_eq!(stack.storage.circuit_breaker_events().len(), 1);

    let skipped = stack.orchestrator.run_cycle().await.unwrap();
    assert_eq!(skipped.status, report.status);
    assert_eq!(stack.storage.circuit_breaker_events().len(), 1);
    assert_eq!(stack.oracle_calls().await, 0);
}

// ============================================
// Run Loop
// ============================================

#[tokio::test]
async fn test_run_loop_starts_immediately_and_stops_on_shutdown() {
    let stack = Stack::start(Mode::Shadow).await;
    stack.reply_with(load_fixture("defense_hold.md")).await;

    let shutdown = CancellationToken::new();
    let handle = stack.orchestrator.start(&shutdown).unwrap();
    assert!(stack.orchestrator.is_running());
    assert!(matches!(
        stack.orchestrator.start(&shutdown),
        Err(OrchestratorError::AlreadyRunning)
    ));

    tokio::time::timeout(Duration::from_secs(5), async {
        while stack.storage.decisions().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("first cycle should run without waiting for the interval");

    shutdown.cancel();
    handle.await.unwrap();

    assert!(!stack.orchestrator.is_running());
    assert_eq!(stack.oracle_calls().await, 1);
}
