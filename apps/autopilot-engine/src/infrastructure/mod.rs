//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer. Following
//! hexagonal architecture:
//!
//! - **Driven Adapters (Outbound)**
//!   - `persistence/`: in-memory storage
//!   - `exchange/`: paper exchange with simulated fills
//!   - `market_data/`: fixed market conditions and news
//!   - `oracle/`: HTTP decision oracle client
//!
//! - **Driver Adapters (Inbound)**
//!   - `http/`: control API

pub mod exchange;
pub mod http;
pub mod market_data;
pub mod oracle;
pub mod persistence;
