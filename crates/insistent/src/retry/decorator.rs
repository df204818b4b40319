//! The retry decorator: drives an operation through a strategy's timeouts.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::strategy::Strategy;
use crate::logger::{Logger, RetryEvent};

/// Per-attempt information handed to the decorated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptContext {
    /// 1-based attempt number
    pub try_count: u32,

    /// Wait before the next attempt if this one fails; `None` on the last
    /// scheduled attempt
    pub next_timeout: Option<Duration>,
}

impl AttemptContext {
    /// True when a failure of this attempt ends the retry loop.
    pub fn is_last_attempt(&self) -> bool {
        self.next_timeout.is_none()
    }
}

/// An operation that can be retried.
///
/// Implemented for every `Fn(A, AttemptContext) -> impl Future<Output = Result<T, E>>`
/// closure, so most callers never implement it by hand.
pub trait Operation<A>: Send + Sync {
    /// Value produced on success
    type Output;

    /// Error signalling a failed attempt
    type Error;

    /// Run one attempt.
    fn invoke(
        &self,
        args: A,
        ctx: AttemptContext,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

impl<F, Fut, A, T, E> Operation<A> for F
where
    F: Fn(A, AttemptContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send,
{
    type Output = T;
    type Error = E;

    fn invoke(&self, args: A, ctx: AttemptContext) -> impl Future<Output = Result<T, E>> + Send {
        self(args, ctx)
    }
}

/// Decides whether a failed attempt may be retried.
///
/// Implemented for `Fn(&E) -> bool` closures.
pub trait RetryPredicate<E>: Send + Sync {
    /// Return `false` to stop retrying after `error`.
    fn should_retry(&self, error: &E) -> bool;
}

/// Retries every failure. The default predicate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryAll;

impl<E> RetryPredicate<E> for RetryAll {
    fn should_retry(&self, _error: &E) -> bool {
        true
    }
}

impl<E, P> RetryPredicate<E> for P
where
    P: Fn(&E) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &E) -> bool {
        self(error)
    }
}

/// Result of one decorated invocation, including the absorbed error.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T, E> {
    /// The operation returned a value.
    Success {
        /// Returned value
        value: T,
        /// Number of invocations made, including the successful one
        attempts: u32,
    },

    /// Every scheduled attempt failed, or the retry predicate refused one.
    Exhausted {
        /// Number of invocations made
        attempts: u32,
        /// Error of the final attempt
        last_error: E,
    },
}

impl<T, E> Outcome<T, E> {
    /// Drop the error, keeping only the value.
    pub fn into_option(self) -> Option<T> {
        match self {
            Outcome::Success { value, .. } => Some(value),
            Outcome::Exhausted { .. } => None,
        }
    }

    /// Number of invocations made.
    pub fn attempts(&self) -> u32 {
        match self {
            Outcome::Success { attempts, .. } | Outcome::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// True for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// Wraps operations so they are retried according to a [`Strategy`].
///
/// The decorator holds no per-call state. Each invocation draws a fresh
/// timeout sequence and keeps its own attempt counter, so a single decorator
/// (or its clones) can drive any number of concurrent invocations.
///
/// Failures are never returned: once the schedule is exhausted the final
/// error is absorbed and the call yields `None`. Use
/// [`Decorated::call_detailed`] to see it.
///
/// # Examples
///
/// ```rust
/// use insistent::retry::{RetryDecoratorBuilder, StrategyKind};
/// use std::time::Duration;
///
/// # async fn example() -> insistent::Result<()> {
/// let retry = RetryDecoratorBuilder::new()
///     .set_initial_timeout(Duration::from_millis(10))?
///     .set_retries(3)?
///     .set_strategy(StrategyKind::Exponential { factor: 2.0 })?
///     .build()?;
///
/// let value = retry
///     .run(|ctx| async move {
///         if ctx.try_count < 2 {
///             Err("not yet")
///         } else {
///             Ok(42)
///         }
///     })
///     .await;
/// assert_eq!(value, Some(42));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RetryDecorator {
    strategy: Strategy,
    logger: Arc<dyn Logger>,
}

impl RetryDecorator {
    /// Pair a strategy with a logger.
    pub fn new(strategy: Strategy, logger: Arc<dyn Logger>) -> Self {
        Self { strategy, logger }
    }

    /// The backoff strategy.
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Wrap an operation. The returned value is invoked with
    /// [`Decorated::call`].
    pub fn wrap<F>(&self, operation: F) -> Decorated<F> {
        Decorated {
            decorator: self.clone(),
            operation,
            predicate: RetryAll,
        }
    }

    /// Retry an operation that only needs the attempt context.
    pub async fn run<F, Fut, T, E>(&self, operation: F) -> Option<T>
    where
        F: Fn(AttemptContext) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, E>> + Send,
        E: fmt::Display,
    {
        self.wrap(move |(): (), ctx: AttemptContext| operation(ctx))
            .call(())
            .await
    }
}

impl fmt::Debug for RetryDecorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryDecorator")
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

/// An operation bound to a [`RetryDecorator`].
#[derive(Clone)]
pub struct Decorated<F, P = RetryAll> {
    decorator: RetryDecorator,
    operation: F,
    predicate: P,
}

impl<F, P> Decorated<F, P> {
    /// Only retry failures accepted by `predicate`.
    ///
    /// A rejected failure ends the invocation immediately, without sleeping,
    /// exactly as if the schedule had been exhausted.
    pub fn retry_if<Q>(self, predicate: Q) -> Decorated<F, Q> {
        Decorated {
            decorator: self.decorator,
            operation: self.operation,
            predicate,
        }
    }

    /// Invoke the operation, retrying on failure.
    ///
    /// Returns `Some(value)` on the first success and `None` once every
    /// scheduled attempt has failed. `args` is cloned for each attempt.
    pub async fn call<A>(&self, args: A) -> Option<F::Output>
    where
        A: Clone,
        F: Operation<A>,
        F::Error: fmt::Display,
        P: RetryPredicate<F::Error>,
    {
        self.call_detailed(args).await.into_option()
    }

    /// Like [`Decorated::call`], but reports the attempt count and the
    /// final error instead of discarding them.
    pub async fn call_detailed<A>(&self, args: A) -> Outcome<F::Output, F::Error>
    where
        A: Clone,
        F: Operation<A>,
        F::Error: fmt::Display,
        P: RetryPredicate<F::Error>,
    {
        let logger = &self.decorator.logger;
        let mut timeouts = self.decorator.strategy.timeouts();
        let mut try_count = 1u32;
        let mut start = Instant::now();

        loop {
            // A drained sequence counts as the sentinel.
            let next_timeout = timeouts.next().flatten();
            let ctx = AttemptContext {
                try_count,
                next_timeout,
            };

            logger.log(&RetryEvent::Attempting {
                try_count,
                elapsed: start.elapsed(),
            });

            // The error is dropped before the sleep so it is never held across it.
            let wait = match self.operation.invoke(args.clone(), ctx).await {
                Ok(value) => {
                    logger.log(&RetryEvent::Succeeded { try_count });
                    return Outcome::Success {
                        value,
                        attempts: try_count,
                    };
                }
                Err(error) => match next_timeout {
                    None => {
                        return Outcome::Exhausted {
                            attempts: try_count,
                            last_error: error,
                        };
                    }
                    Some(_) if !self.predicate.should_retry(&error) => {
                        logger.log(&RetryEvent::Rejected {
                            try_count,
                            error: error.to_string(),
                        });
                        return Outcome::Exhausted {
                            attempts: try_count,
                            last_error: error,
                        };
                    }
                    Some(wait) => {
                        logger.log(&RetryEvent::Failed {
                            try_count,
                            error: error.to_string(),
                        });
                        wait
                    }
                },
            };

            logger.log(&RetryEvent::Retrying { try_count, wait });

            start = Instant::now();
            tokio::time::sleep(wait).await;
            try_count += 1;
        }
    }
}
