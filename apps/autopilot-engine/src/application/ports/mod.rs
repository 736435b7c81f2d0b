//! Application Ports (Driver and Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! - **Driven Ports** (Secondary/Outbound): exchange, price sources,
//!   storage, decision oracle, market data
//! - **Action Ports**: validator and executor seams used by the orchestrator

mod action_ports;
mod exchange_port;
mod market_data_port;
mod oracle_port;
mod price_source_port;
mod storage_port;

pub use action_ports::{ActionExecutor, ActionValidator};
pub use exchange_port::{ExchangeError, ExchangePort};
pub use market_data_port::{MarketDataError, MarketDataPort};
#[cfg(test)]
pub use oracle_port::MockDecisionOraclePort;
pub use oracle_port::{DecisionOraclePort, OracleError};
pub use price_source_port::{ExchangePriceSource, PriceSourceError, PriceSourcePort};
pub use storage_port::{PolicyViolationRecord, StorageError, StoragePort};
