//! Decision Oracle Adapters

mod http;

pub use http::HttpDecisionOracle;
