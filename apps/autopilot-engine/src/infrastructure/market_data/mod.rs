//! Market Data Adapters

mod static_feed;

pub use static_feed::StaticMarketData;
