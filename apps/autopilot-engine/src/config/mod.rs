//! Configuration module for the autopilot engine.
//!
//! Loads a YAML file, interpolates environment variables and validates the
//! result. Every section has defaults, so an empty file is a valid
//! configuration (shadow mode, balanced profile).
//!
//! # Usage
//!
//! ```rust,ignore
//! use autopilot_engine::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//! let policy = config.policy.load_policy()?;
//! ```

mod execution;
mod observability;
mod oracle;
mod orchestrator;
mod policy;
mod server;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use execution::{ExecutionSettings, PaperExchangeSettings};
pub use observability::{LoggingConfig, MetricsSettings, ObservabilityConfig};
pub use oracle::OracleSettings;
pub use orchestrator::OrchestratorSettings;
pub use policy::{POLICY_PROFILE_ENV, PolicySettings};
pub use server::ServerConfig;

use crate::domain::decision::Mode;

/// Environment variable holding the config file path.
pub const CONFIG_PATH_ENV: &str = "AUTOPILOT_CONFIG";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Decision loop.
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
    /// Execution layer.
    #[serde(default)]
    pub execution: ExecutionSettings,
    /// Control API.
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging and metrics.
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Decision oracle client.
    #[serde(default)]
    pub oracle: OracleSettings,
    /// Risk policy.
    #[serde(default)]
    pub policy: PolicySettings,
}

impl Config {
    /// Initial orchestrator mode.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for unknown mode strings.
    pub fn initial_mode(&self) -> Result<Mode, ConfigError> {
        self.orchestrator
            .mode
            .parse()
            .map_err(|e: crate::domain::decision::ModeParseError| {
                ConfigError::ValidationError(format!("orchestrator.mode: {e}"))
            })
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to `AUTOPILOT_CONFIG`,
///   then "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(
        || std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.yaml".to_string()),
        str::to_string,
    );

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = if interpolated.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml_bw::from_str(&interpolated)?
    };
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let var_name = &cap[1];
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    config.initial_mode()?;

    let orchestrator = &config.orchestrator;
    if orchestrator.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.interval_secs must be positive".to_string(),
        ));
    }
    if orchestrator.call_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.call_timeout_secs must be positive".to_string(),
        ));
    }
    if orchestrator.reference_symbol.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "orchestrator.reference_symbol must not be empty".to_string(),
        ));
    }

    if config.execution.price_cache_ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "execution.price_cache_ttl_secs must be positive".to_string(),
        ));
    }

    config.server.socket_addr()?;
    config.observability.metrics.socket_addr()?;

    let valid_formats = ["json", "pretty"];
    if !valid_formats.contains(&config.observability.logging.format.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.format must be one of: {valid_formats:?}"
        )));
    }

    config.policy.validate()?;
    // The selected profile must resolve at startup, not at first use.
    config.policy.load_policy()?;

    Ok(())
}
