//! Runtime tunables for Switchyard.
//!
//! Rule sets are caller-supplied data (see [`crate::registry`]); this module
//! only covers the knobs that shape how a loaded rule set is executed:
//! the escalation threshold, dispatch retry/timeout behavior, and the
//! post-processing richness floor.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_confidence_threshold() -> f64 {
    0.5
}

fn default_min_prose_chars() -> usize {
    48
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_invoke_timeout_ms() -> u64 {
    30_000
}

/// Router-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Decisions with confidence strictly below this value are escalated.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Results with fewer prose characters than this (outside code fences)
    /// are eligible for post-processing when served by a low-fidelity target.
    #[serde(default = "default_min_prose_chars")]
    pub min_prose_chars: usize,

    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// Dispatch retry and timeout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Retries after the first attempt on the selected target.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay; doubles per retry attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on a single backoff delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Wall-clock bound for one backend invocation.
    #[serde(default = "default_invoke_timeout_ms")]
    pub invoke_timeout_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            min_prose_chars: default_min_prose_chars(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            invoke_timeout_ms: default_invoke_timeout_ms(),
        }
    }
}

impl RouterConfig {
    /// Load configuration from environment variables.
    ///
    /// Priority per key: env var > default. Recognized variables:
    /// `SWITCHYARD_CONFIDENCE_THRESHOLD`, `SWITCHYARD_MIN_PROSE_CHARS`,
    /// `SWITCHYARD_MAX_RETRIES`, `SWITCHYARD_BASE_DELAY_MS`,
    /// `SWITCHYARD_MAX_DELAY_MS`, `SWITCHYARD_INVOKE_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            confidence_threshold: parse_optional_env(
                "SWITCHYARD_CONFIDENCE_THRESHOLD",
                default_confidence_threshold(),
            )?,
            min_prose_chars: parse_optional_env(
                "SWITCHYARD_MIN_PROSE_CHARS",
                default_min_prose_chars(),
            )?,
            dispatch: DispatchConfig {
                max_retries: parse_optional_env("SWITCHYARD_MAX_RETRIES", default_max_retries())?,
                base_delay_ms: parse_optional_env(
                    "SWITCHYARD_BASE_DELAY_MS",
                    default_base_delay_ms(),
                )?,
                max_delay_ms: parse_optional_env(
                    "SWITCHYARD_MAX_DELAY_MS",
                    default_max_delay_ms(),
                )?,
                invoke_timeout_ms: parse_optional_env(
                    "SWITCHYARD_INVOKE_TIMEOUT_MS",
                    default_invoke_timeout_ms(),
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values a router cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "confidence_threshold".to_string(),
                message: format!(
                    "must be between 0.0 and 1.0, got {}",
                    self.confidence_threshold
                ),
            });
        }
        if self.dispatch.invoke_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "invoke_timeout_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.dispatch.max_delay_ms < self.dispatch.base_delay_ms {
            return Err(ConfigError::InvalidValue {
                key: "max_delay_ms".to_string(),
                message: format!(
                    "must be >= base_delay_ms ({} < {})",
                    self.dispatch.max_delay_ms, self.dispatch.base_delay_ms
                ),
            });
        }
        Ok(())
    }
}

impl DispatchConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_millis(self.invoke_timeout_ms)
    }
}

pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {key}: {e}"
        ))),
    }
}

pub(crate) fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| {
            s.parse().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
        })
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-global, so serialize tests that mutate them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_are_valid() {
        let config = RouterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.confidence_threshold, 0.5);
        assert_eq!(config.dispatch.max_retries, 2);
        assert_eq!(config.dispatch.invoke_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let config = RouterConfig {
            confidence_threshold: 1.5,
            ..RouterConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("confidence_threshold"));
    }

    #[test]
    fn zero_invoke_timeout_rejected() {
        let mut config = RouterConfig::default();
        config.dispatch.invoke_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn max_delay_below_base_delay_rejected() {
        let mut config = RouterConfig::default();
        config.dispatch.base_delay_ms = 1_000;
        config.dispatch.max_delay_ms = 100;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_delay_ms"));
    }

    #[test]
    fn from_env_reads_overrides() {
        let _lock = ENV_LOCK.lock();
        unsafe {
            std::env::set_var("SWITCHYARD_CONFIDENCE_THRESHOLD", "0.75");
            std::env::set_var("SWITCHYARD_MAX_RETRIES", "5");
        }
        let config = RouterConfig::from_env().unwrap();
        assert_eq!(config.confidence_threshold, 0.75);
        assert_eq!(config.dispatch.max_retries, 5);
        // Untouched keys keep their defaults.
        assert_eq!(config.dispatch.base_delay_ms, 200);
        unsafe {
            std::env::remove_var("SWITCHYARD_CONFIDENCE_THRESHOLD");
            std::env::remove_var("SWITCHYARD_MAX_RETRIES");
        }
    }

    #[test]
    fn from_env_rejects_garbage() {
        let _lock = ENV_LOCK.lock();
        unsafe { std::env::set_var("SWITCHYARD_MAX_RETRIES", "many") };
        let err = RouterConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        unsafe { std::env::remove_var("SWITCHYARD_MAX_RETRIES") };
    }

    #[test]
    fn toml_round_trip_keeps_defaults_for_missing_keys() {
        let config: RouterConfig = toml::from_str("confidence_threshold = 0.3").unwrap();
        assert_eq!(config.confidence_threshold, 0.3);
        assert_eq!(config.min_prose_chars, 48);
        assert_eq!(config.dispatch.max_retries, 2);
    }
}
