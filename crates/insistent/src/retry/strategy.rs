//! Backoff strategies and the timeout sequences they produce.

use std::iter::FusedIterator;
use std::time::Duration;

use crate::config::RetryConfiguration;
use crate::error::{Error, Result};

/// The closed set of backoff variants and their parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrategyKind {
    /// Every wait equals the initial timeout.
    Fixed,

    /// Wait `i` (0-indexed) equals `initial_timeout * factor^i`.
    ///
    /// `factor` must be finite and greater than zero. A factor of `1.0`
    /// behaves like [`StrategyKind::Fixed`].
    Exponential {
        /// Multiplicative growth factor
        factor: f64,
    },

    /// Wait `i` (0-indexed) equals `initial_timeout + increment * i`.
    Linear {
        /// Amount added after each failure
        increment: Duration,
    },
}

impl StrategyKind {
    fn validate(&self) -> Result<()> {
        match *self {
            StrategyKind::Exponential { factor } if !factor.is_finite() || factor <= 0.0 => Err(
                Error::invalid(format!("exponential factor has to be bigger than 0, got {factor}")),
            ),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            StrategyKind::Fixed => "fixed",
            StrategyKind::Exponential { .. } => "exponential",
            StrategyKind::Linear { .. } => "linear",
        }
    }
}

/// A backoff schedule: a validated configuration plus a variant.
///
/// A strategy is immutable and holds no cursor. Every call to
/// [`Strategy::timeouts`] starts a new, independent sequence, so one strategy
/// can be shared by any number of concurrent retry loops.
///
/// # Examples
///
/// ```rust
/// use insistent::config::RetryConfiguration;
/// use insistent::retry::{Strategy, StrategyKind};
/// use std::time::Duration;
///
/// let config = RetryConfiguration::new(Duration::from_secs(1), 3).unwrap();
/// let strategy = Strategy::new(config, StrategyKind::Exponential { factor: 2.0 }).unwrap();
///
/// let timeouts: Vec<_> = strategy.timeouts().collect();
/// assert_eq!(
///     timeouts,
///     vec![
///         Some(Duration::from_secs(1)),
///         Some(Duration::from_secs(2)),
///         Some(Duration::from_secs(4)),
///         None,
///     ]
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strategy {
    config: RetryConfiguration,
    kind: StrategyKind,
}

impl Strategy {
    /// Create a strategy, rejecting invalid variant parameters.
    pub fn new(config: RetryConfiguration, kind: StrategyKind) -> Result<Self> {
        kind.validate()?;
        Ok(Self { config, kind })
    }

    /// Shorthand for a [`StrategyKind::Fixed`] strategy.
    pub fn fixed(config: RetryConfiguration) -> Self {
        Self {
            config,
            kind: StrategyKind::Fixed,
        }
    }

    /// Shorthand for a [`StrategyKind::Exponential`] strategy.
    pub fn exponential(config: RetryConfiguration, factor: f64) -> Result<Self> {
        Self::new(config, StrategyKind::Exponential { factor })
    }

    /// The configuration this strategy was built from.
    pub fn config(&self) -> &RetryConfiguration {
        &self.config
    }

    /// The backoff variant.
    pub fn kind(&self) -> &StrategyKind {
        &self.kind
    }

    /// Produce a fresh timeout sequence.
    ///
    /// The sequence has exactly `max_retries + 1` items. The first
    /// `max_retries` are `Some(wait)`; the last is `None`, meaning no retry
    /// follows the attempt it is paired with.
    pub fn timeouts(&self) -> TimeoutSequence {
        TimeoutSequence {
            strategy: *self,
            position: 0,
        }
    }

    /// Wait before retry number `index + 1`, or `None` once past `max_retries`.
    pub fn timeout_at(&self, index: u32) -> Option<Duration> {
        if index >= self.config.max_retries() {
            return None;
        }

        let initial = self.config.initial_timeout();
        let wait = match self.kind {
            StrategyKind::Fixed => initial,
            StrategyKind::Exponential { factor } if index == 0 || factor == 1.0 => initial,
            StrategyKind::Exponential { factor } => {
                let exp = index.min(i32::MAX as u32) as i32;
                scale(initial, factor.powi(exp))
            }
            StrategyKind::Linear { increment } => {
                initial.saturating_add(increment.saturating_mul(index))
            }
        };
        Some(wait)
    }
}

/// Multiply `initial` by `multiplier`, saturating at [`Duration::MAX`] and
/// never going below 1ns.
///
/// Results that fit in `u64` nanoseconds are rounded in nanoseconds, larger
/// ones are computed in seconds.
fn scale(initial: Duration, multiplier: f64) -> Duration {
    let nanos = initial.as_nanos() as f64 * multiplier;
    if nanos.is_finite() && nanos < u64::MAX as f64 {
        return Duration::from_nanos(nanos.round().max(1.0) as u64);
    }
    Duration::try_from_secs_f64(initial.as_secs_f64() * multiplier).unwrap_or(Duration::MAX)
}

/// Iterator over the waits of one retry loop, ending with the `None` sentinel.
#[derive(Debug, Clone)]
pub struct TimeoutSequence {
    strategy: Strategy,
    position: u64,
}

impl TimeoutSequence {
    fn len_total(&self) -> u64 {
        u64::from(self.strategy.config.max_retries()) + 1
    }
}

impl Iterator for TimeoutSequence {
    type Item = Option<Duration>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.len_total() {
            return None;
        }
        let index = self.position as u32;
        self.position += 1;
        Some(self.strategy.timeout_at(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.len_total() - self.position) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TimeoutSequence {}

impl FusedIterator for TimeoutSequence {}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} backoff (initial {:?}, {} retries)",
            self.kind.name(),
            self.config.initial_timeout(),
            self.config.max_retries()
        )
    }
}
