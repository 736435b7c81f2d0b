//! Application Layer
//!
//! - **Ports**: interfaces to the oracle, exchange, price sources, storage
//!   and market data, plus the validator/executor seams
//! - **Services**: the policy engine and the orchestrator

pub mod ports;
pub mod services;

pub use ports::*;
pub use services::*;
