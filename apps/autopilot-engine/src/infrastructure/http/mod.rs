//! HTTP/REST control API adapter.
//!
//! Inbound adapter exposing mode, kill switch, policy, metrics, circuit
//! breaker and slippage controls, plus a manual cycle trigger.

mod controller;
mod request;
mod response;

pub use controller::{AppState, create_router};
pub use request::*;
pub use response::*;
