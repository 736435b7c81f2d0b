//! Decision Bounded Context
//!
//! What the oracle is asked, what it answers, and the mode the orchestrator
//! runs in.

pub mod action;
pub mod context;
pub mod decision;
pub mod mode;

pub use action::{
    ActionDecodeError, ActionKind, ActionParams, ActionRequest, AutoSellParams, BuyParams,
    GridParams, MAX_ACTION_AMOUNT, PauseParams, RebalanceParams, SellParams,
};
pub use context::{
    AssetStatus, DecisionRequest, MarketConditions, NewsSignal, PortfolioSnapshot, RiskLimits,
    Sentiment,
};
pub use decision::{AiDecision, DecisionError, MAX_ACTIONS_PER_DECISION, Regime};
pub use mode::{Mode, ModeParseError};
