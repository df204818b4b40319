//! Retry strategies and the decorator that applies them.
//!
//! # Key Types
//!
//! - [`Strategy`] / [`StrategyKind`] - Backoff schedules producing a [`TimeoutSequence`]
//! - [`RetryDecorator`] - Wraps operations and drives them through a strategy
//! - [`RetryDecoratorBuilder`] - Validating, fluent construction of a decorator
//!
//! # Examples
//!
//! ```rust
//! use insistent::retry::{RetryDecoratorBuilder, StrategyKind};
//! use std::time::Duration;
//!
//! # async fn example() -> insistent::Result<()> {
//! let retry = RetryDecoratorBuilder::new()
//!     .set_initial_timeout(Duration::from_millis(100))?
//!     .set_retries(3)?
//!     .set_strategy(StrategyKind::Fixed)?
//!     .build()?;
//!
//! let fetch = retry.wrap(|url: &'static str, ctx: insistent::retry::AttemptContext| async move {
//!     if ctx.is_last_attempt() {
//!         Ok(format!("fetched {url}"))
//!     } else {
//!         Err("connection reset")
//!     }
//! });
//! assert_eq!(fetch.call("https://example.com").await.as_deref(), Some("fetched https://example.com"));
//! # Ok(())
//! # }
//! ```

mod builder;
mod decorator;
mod strategy;

pub use builder::RetryDecoratorBuilder;
pub use decorator::{
    AttemptContext, Decorated, Operation, Outcome, RetryAll, RetryDecorator, RetryPredicate,
};
pub use strategy::{Strategy, StrategyKind, TimeoutSequence};
