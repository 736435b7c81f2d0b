//! Exchange Adapters

mod paper;

pub use paper::PaperExchange;
