//! Policy profile selection.
//!
//! Profiles come from `policy.risk_profiles` in the config file, falling back
//! to the built-in `conservative`, `balanced` and `aggressive` profiles when
//! the file defines none. `POLICY_PROFILE` overrides `policy.profile`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::domain::policy::{Policy, PolicyLimits};

/// Environment variable that selects the active profile.
pub const POLICY_PROFILE_ENV: &str = "POLICY_PROFILE";

/// Policy section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySettings {
    /// Active profile name.
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Profiles by name.
    #[serde(default)]
    pub risk_profiles: BTreeMap<String, PolicyLimits>,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            risk_profiles: BTreeMap::new(),
        }
    }
}

impl PolicySettings {
    /// Name of the profile to load, honoring `POLICY_PROFILE`.
    #[must_use]
    pub fn active_profile(&self) -> String {
        match std::env::var(POLICY_PROFILE_ENV) {
            Ok(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => self.profile.clone(),
        }
    }

    /// Build the active policy.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the profile does not exist
    /// or its limits are invalid.
    pub fn load_policy(&self) -> Result<Policy, ConfigError> {
        self.policy_for(&self.active_profile())
    }

    /// Build the policy of profile `name`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the profile does not exist
    /// or its limits are invalid.
    pub fn policy_for(&self, name: &str) -> Result<Policy, ConfigError> {
        let limits = if self.risk_profiles.is_empty() {
            PolicyLimits::builtin(name)
        } else {
            self.risk_profiles.get(name).cloned()
        }
        .ok_or_else(|| {
            ConfigError::ValidationError(format!("policy profile '{name}' not found"))
        })?;

        Policy::new(name, limits).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (name, limits) in &self.risk_profiles {
            limits
                .validate()
                .map_err(|e| ConfigError::ValidationError(format!("risk_profiles.{name}: {e}")))?;
        }
        Ok(())
    }
}

fn default_profile() -> String {
    "balanced".to_string()
}
