//! Fluent builder for [`RetryDecorator`].

use std::sync::Arc;
use std::time::Duration;

use super::decorator::RetryDecorator;
use super::strategy::{Strategy, StrategyKind};
use crate::config::{RetryConfiguration, RetrySettings};
use crate::error::{Error, Result};
use crate::logger::{ConsoleLogger, Logger, TracingLogger};

/// Assembles a [`RetryDecorator`] step by step.
///
/// Every setter validates its input immediately and returns
/// `Err(Error::InvalidConfiguration)` on bad values, so a chain stops at the
/// first mistake. The strategy is built by [`set_strategy`], which therefore
/// needs the initial timeout and the retry count to be set first.
///
/// [`set_strategy`]: RetryDecoratorBuilder::set_strategy
///
/// # Examples
///
/// ```rust
/// use insistent::logger::ConsoleLogger;
/// use insistent::retry::{RetryDecoratorBuilder, StrategyKind};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn example() -> insistent::Result<()> {
/// let retry = RetryDecoratorBuilder::new()
///     .set_initial_timeout(Duration::from_secs(1))?
///     .set_retries(3)?
///     .set_logger(Some(Arc::new(ConsoleLogger::with_prefix("[RetryLogger]"))))
///     .set_strategy(StrategyKind::Exponential { factor: 2.0 })?
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct RetryDecoratorBuilder {
    timeout: Option<Duration>,
    retries: Option<u32>,
    strategy: Option<Strategy>,
    logger: Option<Arc<dyn Logger>>,
}

impl RetryDecoratorBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a builder from serialized settings.
    ///
    /// Runs every setter, so the settings are validated the same way.
    pub fn from_settings(settings: &RetrySettings) -> Result<Self> {
        Self::new()
            .set_initial_timeout(Duration::from_millis(settings.initial_timeout_ms))?
            .set_retries(settings.retries)?
            .set_strategy(StrategyKind::from(&settings.strategy))
    }

    /// Set the wait before the first retry. Must be non-zero.
    pub fn set_initial_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(Error::invalid("timeout has to be bigger than 0"));
        }
        self.timeout = Some(timeout);
        Ok(self)
    }

    /// Set the initial timeout in (fractional) seconds. Must be positive.
    pub fn set_initial_timeout_secs(self, seconds: f64) -> Result<Self> {
        if seconds.is_nan() || seconds <= 0.0 {
            return Err(Error::invalid(format!(
                "timeout has to be bigger than 0, got {seconds}"
            )));
        }
        let timeout = Duration::try_from_secs_f64(seconds)
            .map_err(|e| Error::invalid(format!("timeout of {seconds}s is out of range: {e}")))?;
        self.set_initial_timeout(timeout)
    }

    /// Set how many times a failed operation is retried. Must be non-zero.
    pub fn set_retries(mut self, retries: u32) -> Result<Self> {
        if retries == 0 {
            return Err(Error::invalid("retries count has to be bigger than 0"));
        }
        self.retries = Some(retries);
        Ok(self)
    }

    /// Build the strategy from the timeout and retries set so far.
    pub fn set_strategy(mut self, kind: StrategyKind) -> Result<Self> {
        let (Some(timeout), Some(retries)) = (self.timeout, self.retries) else {
            return Err(Error::invalid(
                "initial timeout and retries must be set before the strategy",
            ));
        };
        let config = RetryConfiguration::new(timeout, retries)?;
        self.strategy = Some(Strategy::new(config, kind)?);
        Ok(self)
    }

    /// Set the logger. `None` selects a [`ConsoleLogger`].
    pub fn set_logger(mut self, logger: Option<Arc<dyn Logger>>) -> Self {
        self.logger = Some(logger.unwrap_or_else(|| Arc::new(ConsoleLogger::default())));
        self
    }

    /// Set the logger from any [`Logger`] value, including closures.
    pub fn with_logger(self, logger: impl Logger + 'static) -> Self {
        self.set_logger(Some(Arc::new(logger)))
    }

    /// Finish building.
    ///
    /// Fails if no strategy was set. Without a logger the decorator reports
    /// through [`TracingLogger`].
    pub fn build(self) -> Result<RetryDecorator> {
        let strategy = self
            .strategy
            .ok_or_else(|| Error::invalid("a strategy must be set before building"))?;
        let logger = self.logger.unwrap_or_else(|| Arc::new(TracingLogger));
        tracing::debug!(%strategy, "built retry decorator");
        Ok(RetryDecorator::new(strategy, logger))
    }
}

impl std::fmt::Debug for RetryDecoratorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryDecoratorBuilder")
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("strategy", &self.strategy)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}
