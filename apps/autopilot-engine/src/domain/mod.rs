//! Domain Layer
//!
//! Business rules with no infrastructure dependencies.
//!
//! # Bounded Contexts
//!
//! - [`policy`]: Risk profile, circuit breakers, violations, risk score
//! - [`decision`]: Oracle decisions, typed actions, run mode
//! - [`portfolio`]: Balance and trade read models
//! - [`shared`]: Identifiers, symbols, order side

pub mod decision;
pub mod policy;
pub mod portfolio;
pub mod shared;
