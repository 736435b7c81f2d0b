//! Autopilot Engine Binary
//!
//! Runs the decision loop against the paper exchange and exposes the
//! control API.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin autopilot-engine
//! ```
//!
//! # Environment Variables
//!
//! - `AUTOPILOT_CONFIG`: Config file path (default: config.yaml)
//! - `POLICY_PROFILE`: Risk profile override (conservative | balanced | aggressive)
//! - `RUST_LOG`: Log filter (default: `autopilot_engine=<observability.logging.level>`)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use autopilot_engine::application::ports::ExchangePriceSource;
use autopilot_engine::application::services::{Orchestrator, OrchestratorPorts, PolicyEngine};
use autopilot_engine::config::{Config, load_config};
use autopilot_engine::domain::decision::MarketConditions;
use autopilot_engine::domain::shared::Symbol;
use autopilot_engine::execution::{Executor, PriceFailover, SlippageGuard};
use autopilot_engine::infrastructure::exchange::PaperExchange;
use autopilot_engine::infrastructure::http::{AppState, create_router};
use autopilot_engine::infrastructure::market_data::StaticMarketData;
use autopilot_engine::infrastructure::oracle::HttpDecisionOracle;
use autopilot_engine::infrastructure::persistence::InMemoryStorage;
use autopilot_engine::observability::{MetricsConfig, init_logging, init_metrics};
use autopilot_engine::safety::KillSwitch;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Components the binary wires together.
struct Engine {
    orchestrator: Arc<Orchestrator>,
    kill_switch: Arc<KillSwitch>,
    slippage: Arc<SlippageGuard>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config = load_config(None).context("failed to load configuration")?;
    init_logging(&config.observability.logging);

    tracing::info!("Starting Autopilot Engine");
    log_config(&config);

    start_metrics(&config)?;

    let engine = build_engine(&config)?;
    let shutdown_token = CancellationToken::new();

    let loop_handle = engine
        .orchestrator
        .start(&shutdown_token)
        .context("failed to start orchestrator")?;
    let http_handle = start_http_server(&config, &engine, shutdown_token.clone()).await?;

    tracing::info!("Autopilot engine ready");

    shutdown_signal().await;
    shutdown_token.cancel();

    await_shutdown(loop_handle, http_handle).await;

    tracing::info!("Autopilot engine stopped");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Log the parsed configuration.
fn log_config(config: &Config) {
    tracing::info!(
        mode = %config.orchestrator.mode,
        interval_secs = config.orchestrator.interval_secs,
        profile = %config.policy.active_profile(),
        oracle_configured = !config.oracle.endpoint.is_empty(),
        http_port = config.server.http_port,
        "Configuration loaded"
    );
}

/// Start the Prometheus exporter when an address is configured.
fn start_metrics(config: &Config) -> anyhow::Result<()> {
    let Some(addr) = config.observability.metrics.socket_addr()? else {
        return Ok(());
    };
    if let Err(e) = init_metrics(&MetricsConfig::with_addr(addr)) {
        tracing::warn!(error = %e, "Failed to start metrics exporter, continuing without it");
    }
    Ok(())
}

/// Wire adapters, safety gates and services.
fn build_engine(config: &Config) -> anyhow::Result<Engine> {
    let policy = config.policy.load_policy().context("failed to load policy")?;
    let mode = config.initial_mode()?;
    let runtime = config.orchestrator.to_runtime();

    let storage = Arc::new(InMemoryStorage::new());
    let market = Arc::new(StaticMarketData::new(MarketConditions::unavailable(
        runtime.reference_symbol.clone(),
    )));

    let paper = &config.execution.paper;
    let exchange =
        PaperExchange::new(paper.quote_balance).with_ledger(Arc::clone(&storage));
    for (symbol, price) in &paper.prices {
        exchange.set_price(Symbol::new(symbol), *price);
    }
    storage.set_enabled_assets(paper.prices.keys().map(Symbol::new).collect());
    let exchange = Arc::new(exchange);

    let prices = Arc::new(
        PriceFailover::new(Arc::new(ExchangePriceSource::new("paper", Arc::clone(&exchange))))
            .with_cache_ttl(config.execution.price_cache_ttl())
            .with_source_timeout(config.execution.price_source_timeout()),
    );

    let kill_switch = Arc::new(KillSwitch::new());
    let slippage = Arc::new(SlippageGuard::new(policy.slippage_threshold()));
    let validator = Arc::new(PolicyEngine::new(
        policy,
        Arc::clone(&storage),
        Arc::clone(&market),
    ));
    let executor = Arc::new(Executor::new(
        exchange,
        Arc::clone(&validator),
        Arc::clone(&kill_switch),
        Arc::clone(&prices),
        Arc::clone(&slippage),
    ));

    let oracle = HttpDecisionOracle::new(&config.oracle).context("failed to build oracle client")?;
    if !oracle.is_configured() {
        tracing::warn!("No oracle endpoint configured, every decision cycle will abort");
    }

    let orchestrator = Arc::new(Orchestrator::new(
        OrchestratorPorts {
            oracle: Arc::new(oracle),
            validator,
            executor,
            storage,
            market_data: market,
        },
        prices,
        Arc::clone(&kill_switch),
        runtime,
        mode,
    ));

    Ok(Engine {
        orchestrator,
        kill_switch,
        slippage,
    })
}

/// Start the HTTP server with graceful shutdown support.
async fn start_http_server(
    config: &Config,
    engine: &Engine,
    shutdown: CancellationToken,
) -> anyhow::Result<JoinHandle<()>> {
    let state = AppState {
        orchestrator: Arc::clone(&engine.orchestrator),
        kill_switch: Arc::clone(&engine.kill_switch),
        slippage: Arc::clone(&engine.slippage),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let app = create_router(state);

    let http_addr = config.server.socket_addr()?;

    tracing::info!(%http_addr, "HTTP server starting");

    let listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("failed to bind {http_addr}"))?;
    let http_server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await });

    Ok(tokio::spawn(async move {
        if let Err(e) = http_server.await {
            tracing::error!("HTTP server error: {e}");
        }
    }))
}

/// Wait for the run loop and the server to drain, bounded by the shutdown timeout.
async fn await_shutdown(loop_handle: JoinHandle<()>, http_handle: JoinHandle<()>) {
    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );

    let drain = async {
        if let Err(e) = loop_handle.await {
            tracing::error!(error = %e, "Orchestrator task failed");
        }
        if let Err(e) = http_handle.await {
            tracing::error!(error = %e, "HTTP server task failed");
        }
    };

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, drain).await.is_err() {
        tracing::warn!("Shutdown timed out, in-flight work abandoned");
    }
}

/// Load .env file from any ancestor directory.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. Without them the process
/// cannot drain its in-flight cycle on termination.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
