//! Global kill switch.
//!
//! One flag plus metadata behind a reader/writer lock. Status checks take
//! the read side and never block each other. There is no timeout and no
//! self-clearing: only [`KillSwitch::deactivate`] turns it off.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::observability;

/// Snapshot of the kill switch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillSwitchStatus {
    /// Whether execution is blocked.
    pub active: bool,
    /// Why it was engaged.
    pub reason: Option<String>,
    /// When it was engaged.
    pub activated_at: Option<DateTime<Utc>>,
}

/// Emergency stop for all order execution.
#[derive(Debug, Default)]
pub struct KillSwitch {
    state: RwLock<KillSwitchStatus>,
}

impl KillSwitch {
    /// Create an inactive kill switch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engage the kill switch.
    ///
    /// If already engaged, the original reason and time are kept.
    pub fn activate(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let mut state = self.state.write();
        if state.active {
            tracing::warn!(
                reason = %reason,
                original_reason = state.reason.as_deref().unwrap_or_default(),
                "Kill switch already active"
            );
            return;
        }

        let now = Utc::now();
        state.active = true;
        state.reason = Some(reason.clone());
        state.activated_at = Some(now);
        drop(state);

        observability::set_kill_switch_active(true);
        tracing::error!(reason = %reason, activated_at = %now, "Kill switch ACTIVATED");
    }

    /// Release the kill switch. Manual only.
    pub fn deactivate(&self) {
        let mut state = self.state.write();
        if !state.active {
            return;
        }
        let previous = state.reason.take();
        state.active = false;
        state.activated_at = None;
        drop(state);

        observability::set_kill_switch_active(false);
        tracing::warn!(
            previous_reason = previous.as_deref().unwrap_or_default(),
            "Kill switch deactivated"
        );
    }

    /// Whether execution is blocked.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.read().active
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> KillSwitchStatus {
        self.state.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn starts_inactive() {
        let switch = KillSwitch::new();
        assert!(!switch.is_active());
        assert_eq!(switch.status(), KillSwitchStatus::default());
    }

    #[test]
    fn activate_records_reason_and_time() {
        let switch = KillSwitch::new();
        switch.activate("exchange outage");

        let status = switch.status();
        assert!(status.active);
        assert_eq!(status.reason.as_deref(), Some("exchange outage"));
        assert!(status.activated_at.is_some());
    }

    #[test]
    fn second_activation_keeps_original_reason() {
        let switch = KillSwitch::new();
        switch.activate("first");
        switch.activate("second");
        assert_eq!(switch.status().reason.as_deref(), Some("first"));
    }

    #[test]
    fn deactivate_clears_state() {
        let switch = KillSwitch::new();
        switch.activate("drill");
        switch.deactivate();

        assert!(!switch.is_active());
        assert_eq!(switch.status(), KillSwitchStatus::default());
    }

    #[test]
    fn concurrent_readers_see_activation() {
        let switch = Arc::new(KillSwitch::new());
        switch.activate("halt");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let switch = Arc::clone(&switch);
                std::thread::spawn(move || switch.is_active())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
