//! Retry configuration
//!
//! [`RetryConfiguration`] is the validated pair every strategy is built from.
//! [`RetrySettings`] is its serializable, environment-loadable counterpart.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::retry::{RetryDecorator, RetryDecoratorBuilder, StrategyKind};

/// Validated initial timeout and retry count.
///
/// Both fields are strictly positive. Instances can only be obtained through
/// [`RetryConfiguration::new`], so every strategy holding one may rely on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfiguration {
    initial_timeout: Duration,
    max_retries: u32,
}

impl RetryConfiguration {
    /// Create a configuration, failing fast on a zero timeout or zero retries.
    pub fn new(initial_timeout: Duration, max_retries: u32) -> Result<Self> {
        if initial_timeout.is_zero() {
            return Err(Error::invalid("initial timeout has to be bigger than 0"));
        }
        if max_retries == 0 {
            return Err(Error::invalid("retries count has to be bigger than 0"));
        }
        Ok(Self {
            initial_timeout,
            max_retries,
        })
    }

    /// Wait before the first retry.
    pub fn initial_timeout(&self) -> Duration {
        self.initial_timeout
    }

    /// Number of retries after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Strategy selection in serialized settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StrategySettings {
    /// Constant wait.
    Fixed,
    /// Wait multiplied by `factor` after each failure.
    Exponential {
        /// Growth factor
        factor: f64,
    },
    /// Wait grown by `increment_ms` after each failure.
    Linear {
        /// Growth step in milliseconds
        increment_ms: u64,
    },
}

impl StrategySettings {
    fn kind_name(&self) -> &'static str {
        match self {
            StrategySettings::Fixed => "fixed",
            StrategySettings::Exponential { .. } => "exponential",
            StrategySettings::Linear { .. } => "linear",
        }
    }
}

impl From<&StrategySettings> for StrategyKind {
    fn from(settings: &StrategySettings) -> Self {
        match settings {
            StrategySettings::Fixed => StrategyKind::Fixed,
            StrategySettings::Exponential { factor } => StrategyKind::Exponential { factor: *factor },
            StrategySettings::Linear { increment_ms } => StrategyKind::Linear {
                increment: Duration::from_millis(*increment_ms),
            },
        }
    }
}

/// Serializable retry settings.
///
/// Values are not validated until [`RetrySettings::build`] (or
/// [`RetryDecoratorBuilder::from_settings`]) runs them through the builder.
///
/// # Examples
///
/// ```rust
/// use insistent::config::{RetrySettings, StrategySettings};
///
/// let settings = RetrySettings::from_json(
///     r#"{"initial_timeout_ms": 250, "retries": 5, "strategy": {"kind": "fixed"}}"#,
/// ).unwrap();
/// assert_eq!(settings.strategy, StrategySettings::Fixed);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Wait before the first retry, in milliseconds
    pub initial_timeout_ms: u64,

    /// Number of retries after the first attempt
    pub retries: u32,

    /// Backoff strategy
    pub strategy: StrategySettings,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_timeout_ms: 1000,
            retries: 3,
            strategy: StrategySettings::Exponential { factor: 2.0 },
        }
    }
}

impl RetrySettings {
    /// Parse settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from environment variables, on top of the defaults.
    ///
    /// This will look for:
    /// - `INSISTENT_INITIAL_TIMEOUT_MS` for the initial timeout (must be a valid u64)
    /// - `INSISTENT_RETRIES` for the retry count (must be a valid u32)
    /// - `INSISTENT_STRATEGY` for the strategy (`fixed`, `exponential` or `linear`)
    /// - `INSISTENT_FACTOR` for the exponential factor (default 2.0)
    /// - `INSISTENT_INCREMENT_MS` for the linear increment (default: the initial timeout)
    ///
    /// A value that is not valid Unicode, or a parameter that does not belong
    /// to the selected strategy, is reported as [`Error::Environment`].
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();

        if let Some(raw) = read_var("INSISTENT_INITIAL_TIMEOUT_MS")? {
            settings.initial_timeout_ms = parse_var("INSISTENT_INITIAL_TIMEOUT_MS", raw)?;
        }

        if let Some(raw) = read_var("INSISTENT_RETRIES")? {
            settings.retries = parse_var("INSISTENT_RETRIES", raw)?;
        }

        let mut factor = read_var("INSISTENT_FACTOR")?;
        let mut increment_ms = read_var("INSISTENT_INCREMENT_MS")?;
        let kind = read_var("INSISTENT_STRATEGY")?
            .unwrap_or_else(|| settings.strategy.kind_name().to_string());

        settings.strategy = match kind.to_ascii_lowercase().as_str() {
            "fixed" => StrategySettings::Fixed,
            "exponential" => StrategySettings::Exponential {
                factor: match factor.take() {
                    Some(raw) => parse_var("INSISTENT_FACTOR", raw)?,
                    None => 2.0,
                },
            },
            "linear" => StrategySettings::Linear {
                increment_ms: match increment_ms.take() {
                    Some(raw) => parse_var("INSISTENT_INCREMENT_MS", raw)?,
                    None => settings.initial_timeout_ms,
                },
            },
            _ => {
                return Err(Error::Environment {
                    var: "INSISTENT_STRATEGY".to_string(),
                    value: kind,
                });
            }
        };

        // Anything left over was set for a strategy that is not in use.
        let leftovers = [
            ("INSISTENT_FACTOR", factor),
            ("INSISTENT_INCREMENT_MS", increment_ms),
        ];
        if let Some((var, Some(value))) = leftovers.into_iter().find(|(_, raw)| raw.is_some()) {
            return Err(Error::Environment {
                var: var.to_string(),
                value,
            });
        }

        Ok(settings)
    }

    /// Validate the settings and build a decorator from them.
    pub fn build(&self) -> Result<RetryDecorator> {
        RetryDecoratorBuilder::from_settings(self)?.build()
    }
}

/// Read a variable, treating only "not set" as absent.
fn read_var(var: &str) -> Result<Option<String>> {
    match std::env::var(var) {
        Ok(raw) => Ok(Some(raw)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(raw)) => Err(Error::Environment {
            var: var.to_string(),
            value: raw.to_string_lossy().into_owned(),
        }),
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, raw: String) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| Error::Environment {
        var: var.to_string(),
        value: raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_accepts_positive_values() {
        let config = RetryConfiguration::new(Duration::from_secs(1), 3).unwrap();
        assert_eq!(config.initial_timeout(), Duration::from_secs(1));
        assert_eq!(config.max_retries(), 3);
    }

    #[test]
    fn test_configuration_rejects_zero_timeout() {
        let err = RetryConfiguration::new(Duration::ZERO, 3).unwrap_err();
        assert!(err.is_invalid_configuration());
    }

    #[test]
    fn test_configuration_rejects_zero_retries() {
        let err = RetryConfiguration::new(Duration::from_millis(10), 0).unwrap_err();
        assert!(err.is_invalid_configuration());
    }

    #[test]
    fn test_settings_default() {
        let settings = RetrySettings::default();
        assert_eq!(settings.initial_timeout_ms, 1000);
        assert_eq!(settings.retries, 3);
        assert_eq!(settings.strategy, StrategySettings::Exponential { factor: 2.0 });
    }

    #[test]
    fn test_settings_from_json() {
        let settings = RetrySettings::from_json(
            r#"{
                "initial_timeout_ms": 100,
                "retries": 4,
                "strategy": {"kind": "linear", "increment_ms": 50}
            }"#,
        )
        .unwrap();
        assert_eq!(settings.initial_timeout_ms, 100);
        assert_eq!(settings.retries, 4);
        assert_eq!(settings.strategy, StrategySettings::Linear { increment_ms: 50 });
    }

    #[test]
    fn test_settings_from_bad_json() {
        let err = RetrySettings::from_json(r#"{"retries": "three"}"#).unwrap_err();
        assert!(matches!(err, Error::Settings(_)));
    }

    #[test]
    fn test_settings_from_toml() {
        let settings: RetrySettings = toml::from_str(
            r#"
            initial_timeout_ms = 500
            retries = 2

            [strategy]
            kind = "exponential"
            factor = 3.0
            "#,
        )
        .unwrap();
        assert_eq!(settings.strategy, StrategySettings::Exponential { factor: 3.0 });
        assert!(settings.build().is_ok());
    }

    #[test]
    fn test_settings_build_validates() {
        let settings = RetrySettings {
            retries: 0,
            ..Default::default()
        };
        let err = settings.build().unwrap_err();
        assert!(err.is_invalid_configuration());
    }

    #[test]
    fn test_settings_from_env() {
        temp_env::with_vars(
            [
                ("INSISTENT_INITIAL_TIMEOUT_MS", Some("250")),
                ("INSISTENT_RETRIES", Some("5")),
                ("INSISTENT_STRATEGY", Some("exponential")),
                ("INSISTENT_FACTOR", Some("1.5")),
                ("INSISTENT_INCREMENT_MS", None),
            ],
            || {
                let settings = RetrySettings::from_env().unwrap();
                assert_eq!(settings.initial_timeout_ms, 250);
                assert_eq!(settings.retries, 5);
                assert_eq!(settings.strategy, StrategySettings::Exponential { factor: 1.5 });
            },
        );
    }

    #[test]
    fn test_settings_from_env_linear_defaults_increment() {
        temp_env::with_vars(
            [
                ("INSISTENT_INITIAL_TIMEOUT_MS", Some("300")),
                ("INSISTENT_RETRIES", None),
                ("INSISTENT_STRATEGY", Some("Linear")),
                ("INSISTENT_FACTOR", None),
                ("INSISTENT_INCREMENT_MS", None),
            ],
            || {
                let settings = RetrySettings::from_env().unwrap();
                assert_eq!(settings.retries, 3);
                assert_eq!(settings.strategy, StrategySettings::Linear { increment_ms: 300 });
            },
        );
    }

    #[test]
    fn test_settings_from_env_rejects_garbage() {
        temp_env::with_vars(
            [
                ("INSISTENT_INITIAL_TIMEOUT_MS", None),
                ("INSISTENT_RETRIES", Some("-5")),
                ("INSISTENT_STRATEGY", None),
                ("INSISTENT_FACTOR", None),
                ("INSISTENT_INCREMENT_MS", None),
            ],
            || {
                let err = RetrySettings::from_env().unwrap_err();
                assert_eq!(
                    err,
                    Error::Environment {
                        var: "INSISTENT_RETRIES".to_string(),
                        value: "-5".to_string(),
                    }
                );
            },
        );

        temp_env::with_vars(
            [
                ("INSISTENT_INITIAL_TIMEOUT_MS", None::<&str>),
                ("INSISTENT_RETRIES", None),
                ("INSISTENT_STRATEGY", Some("random")),
                ("INSISTENT_FACTOR", None),
                ("INSISTENT_INCREMENT_MS", None),
            ],
            || {
                let err = RetrySettings::from_env().unwrap_err();
                assert!(matches!(err, Error::Environment { ref var, .. } if var == "INSISTENT_STRATEGY"));
            },
        );
    }

    #[test]
    fn test_settings_from_env_rejects_parameter_of_other_strategy() {
        temp_env::with_vars(
            [
                ("INSISTENT_INITIAL_TIMEOUT_MS", None::<&str>),
                ("INSISTENT_RETRIES", None),
                ("INSISTENT_STRATEGY", None),
                ("INSISTENT_FACTOR", None),
                ("INSISTENT_INCREMENT_MS", Some("50")),
            ],
            || {
                let err = RetrySettings::from_env().unwrap_err();
                assert_eq!(
                    err,
                    Error::Environment {
                        var: "INSISTENT_INCREMENT_MS".to_string(),
                        value: "50".to_string(),
                    }
                );
            },
        );

        temp_env::with_vars(
            [
                ("INSISTENT_INITIAL_TIMEOUT_MS", None::<&str>),
                ("INSISTENT_RETRIES", None),
                ("INSISTENT_STRATEGY", Some("fixed")),
                ("INSISTENT_FACTOR", Some("3")),
                ("INSISTENT_INCREMENT_MS", None),
            ],
            || {
                let err = RetrySettings::from_env().unwrap_err();
                assert!(matches!(err, Error::Environment { ref var, .. } if var == "INSISTENT_FACTOR"));
            },
        );
    }

    #[test]
    fn test_settings_from_env_factor_applies_to_default_strategy() {
        temp_env::with_vars(
            [
                ("INSISTENT_INITIAL_TIMEOUT_MS", None::<&str>),
                ("INSISTENT_RETRIES", None),
                ("INSISTENT_STRATEGY", None),
                ("INSISTENT_FACTOR", Some("3")),
                ("INSISTENT_INCREMENT_MS", None),
            ],
            || {
                let settings = RetrySettings::from_env().unwrap();
                assert_eq!(settings.strategy, StrategySettings::Exponential { factor: 3.0 });
            },
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_settings_from_env_rejects_non_unicode() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"12\xff");
        temp_env::with_vars(
            [
                ("INSISTENT_INITIAL_TIMEOUT_MS", None),
                ("INSISTENT_RETRIES", Some(raw)),
                ("INSISTENT_STRATEGY", None),
                ("INSISTENT_FACTOR", None),
                ("INSISTENT_INCREMENT_MS", None),
            ],
            || {
                let err = RetrySettings::from_env().unwrap_err();
                assert!(matches!(err, Error::Environment { ref var, .. } if var == "INSISTENT_RETRIES"));
            },
        );
    }
}
