//! Process-wide enforcement switch.
//!
//! Whether decoration wraps a function at all is decided when it is
//! decorated, never per call. The switch has two layers:
//!
//! - the `enforce` cargo feature (default on); without it every decoration
//!   is a pass-through,
//! - a startup-time [`EnforcementConfig`], set once with [`init`] or read
//!   lazily from the `COVENANT_CHECKS` environment variable.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable consulted when [`init`] was never called.
pub const ENV_VAR: &str = "COVENANT_CHECKS";

static CONFIG: OnceLock<EnforcementConfig> = OnceLock::new();

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("enforcement config already initialized (enabled = {})", .0.enabled)]
    AlreadyInitialized(EnforcementConfig),
}

/// Startup-time enforcement settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementConfig {
    /// Wrap decorated functions with contract checks.
    pub enabled: bool,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl EnforcementConfig {
    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Read [`ENV_VAR`]; unset means enabled.
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(ENV_VAR).ok().as_deref())
    }

    /// Interpret a raw environment value. `0`, `false`, `off` and `no`
    /// disable checks; anything unrecognised keeps them on.
    pub fn from_env_value(value: Option<&str>) -> Self {
        let Some(raw) = value else {
            return Self::default();
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "0" | "false" | "off" | "no" => Self::disabled(),
            "" | "1" | "true" | "on" | "yes" => Self::enabled(),
            other => {
                tracing::warn!(
                    var = ENV_VAR,
                    value = other,
                    "Unrecognised enforcement setting, keeping checks enabled"
                );
                Self::enabled()
            }
        }
    }

    /// Whether decoration should wrap, taking the cargo feature into account.
    pub fn checks_active(&self) -> bool {
        cfg!(feature = "enforce") && self.enabled
    }
}

/// Set the process-wide config. Must happen before the first decoration
/// that reads it; a second call fails.
pub fn init(config: EnforcementConfig) -> Result<(), ConfigError> {
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyInitialized(current()))
}

/// The process-wide config, initialising it from the environment if needed.
pub fn current() -> EnforcementConfig {
    *CONFIG.get_or_init(EnforcementConfig::from_env)
}

/// Whether decorations made now will enforce contracts.
pub fn checks_enabled() -> bool {
    current().checks_active()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_values() {
        assert!(EnforcementConfig::from_env_value(None).enabled);
        assert!(EnforcementConfig::from_env_value(Some("1")).enabled);
        assert!(EnforcementConfig::from_env_value(Some("")).enabled);
        assert!(EnforcementConfig::from_env_value(Some("maybe")).enabled);
        assert!(!EnforcementConfig::from_env_value(Some("0")).enabled);
        assert!(!EnforcementConfig::from_env_value(Some(" OFF ")).enabled);
        assert!(!EnforcementConfig::from_env_value(Some("false")).enabled);
    }

    #[test]
    fn test_disabled_config_is_never_active() {
        assert!(!EnforcementConfig::disabled().checks_active());
        assert_eq!(
            EnforcementConfig::enabled().checks_active(),
            cfg!(feature = "enforce")
        );
    }

    #[test]
    fn test_init_is_once_only() {
        let first = current();
        assert_eq!(
            init(EnforcementConfig::disabled()).unwrap_err(),
            ConfigError::AlreadyInitialized(first)
        );
        assert_eq!(current(), first);
    }
}
