//! Application Services
//!
//! Long-lived services that coordinate domain logic and driven ports: the
//! policy engine and the decision loop orchestrator.

mod orchestrator;
mod policy_engine;

pub use orchestrator::{
    CycleReport, CycleStatus, Orchestrator, OrchestratorConfig, OrchestratorError, OrchestratorPorts,
};
pub use policy_engine::PolicyEngine;
