#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Retry decorator with pluggable backoff strategies.
//!
//! insistent re-invokes a fallible async operation according to a backoff
//! schedule until it succeeds or the schedule runs out:
//!
//! - **Strategies** produce a finite sequence of waits ending in a `None`
//!   sentinel (fixed, exponential and linear growth)
//! - **The decorator** drives an operation through that sequence, sleeping
//!   cooperatively with `tokio::time::sleep` between attempts
//! - **The builder** validates every setting as it is given
//!
//! Failures of the operation never escape: an exhausted schedule yields
//! `None`. Configuration mistakes are reported as [`Error::InvalidConfiguration`].
//!
//! # Examples
//!
//! Using the prelude for convenient imports:
//!
//! ```rust
//! use insistent::prelude::*;
//! use std::time::Duration;
//!
//! # async fn example() -> insistent::Result<()> {
//! let retry = RetryDecoratorBuilder::new()
//!     .set_initial_timeout(Duration::from_millis(100))?
//!     .set_retries(3)?
//!     .set_strategy(StrategyKind::Exponential { factor: 2.0 })?
//!     .build()?;
//!
//! let result = retry
//!     .run(|ctx| async move {
//!         println!("attempt #{}, next wait {:?}", ctx.try_count, ctx.next_timeout);
//!         Ok::<_, std::io::Error>(42)
//!     })
//!     .await;
//! assert_eq!(result, Some(42));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logger;
pub mod retry;


pub use error::{Error, Result};

#[cfg(feature = "trace")]
pub use logger::init_tracing;

/// Convenient re-exports of commonly used items.
///
/// Import all core abstractions with:
///
/// ```rust
/// use insistent::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{RetryConfiguration, RetrySettings, StrategySettings};
    pub use crate::error::{Error, Result};
    pub use crate::logger::{ConsoleLogger, Logger, RetryEvent, TracingLogger};
    pub use crate::retry::{
        AttemptContext, Outcome, RetryDecorator, RetryDecoratorBuilder, Strategy, StrategyKind,
    };
}
