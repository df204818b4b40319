//! Progress reporting for retry loops
//!
//! A [`Logger`] receives one [`RetryEvent`] per reporting point of the retry
//! loop. It is a side channel only: nothing a logger does can change whether
//! an operation is retried.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

/// A reportable point in a retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryEvent {
    /// The operation is about to be invoked.
    Attempting {
        /// 1-based attempt number
        try_count: u32,
        /// Time since the loop started, or since the previous failure
        elapsed: Duration,
    },

    /// The operation returned an error and another attempt is scheduled.
    Failed {
        /// Attempt that failed
        try_count: u32,
        /// Rendered error
        error: String,
    },

    /// The loop is about to sleep before the next attempt.
    Retrying {
        /// Attempt that failed
        try_count: u32,
        /// Time until the next attempt
        wait: Duration,
    },

    /// The operation returned a value.
    Succeeded {
        /// Attempt that succeeded
        try_count: u32,
    },

    /// A retry predicate refused to retry the error; the loop stops.
    Rejected {
        /// Attempt that failed
        try_count: u32,
        /// Rendered error
        error: String,
    },
}

impl RetryEvent {
    /// The attempt this event refers to.
    pub fn try_count(&self) -> u32 {
        match self {
            RetryEvent::Attempting { try_count, .. }
            | RetryEvent::Failed { try_count, .. }
            | RetryEvent::Retrying { try_count, .. }
            | RetryEvent::Succeeded { try_count }
            | RetryEvent::Rejected { try_count, .. } => *try_count,
        }
    }
}

impl fmt::Display for RetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryEvent::Attempting { elapsed, .. } => write!(
                f,
                "Time elapsed before executing function {:.3} seconds",
                elapsed.as_secs_f64()
            ),
            RetryEvent::Failed { error, .. } => write!(f, "Operation failed: {error}"),
            RetryEvent::Retrying { try_count, wait } => write!(
                f,
                "Decorated function tries count: #{try_count} | Retrying in {:.3} seconds",
                wait.as_secs_f64()
            ),
            RetryEvent::Succeeded { .. } => {
                write!(f, "Decorated function returned a value successfully.")
            }
            RetryEvent::Rejected { try_count, error } => write!(
                f,
                "Decorated function tries count: #{try_count} | Not retrying: {error}"
            ),
        }
    }
}

/// Sink for retry progress.
///
/// Any `Fn(&RetryEvent) + Send + Sync` closure is a logger.
///
/// # Examples
///
/// ```rust
/// use insistent::logger::{Logger, RetryEvent};
///
/// let logger = |event: &RetryEvent| eprintln!("[retry] {event}");
/// logger.log(&RetryEvent::Succeeded { try_count: 1 });
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait Logger: Send + Sync {
    /// Report one event. Called synchronously from the retry loop.
    fn log(&self, event: &RetryEvent);
}

impl<F> Logger for F
where
    F: Fn(&RetryEvent) + Send + Sync,
{
    fn log(&self, event: &RetryEvent) {
        self(event)
    }
}

/// Prints every event to stdout behind a prefix.
///
/// Used when a builder is given no logger explicitly.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    prefix: String,
}

impl ConsoleLogger {
    /// Create a console logger with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn render(&self, event: &RetryEvent) -> String {
        format!("{} {}", self.prefix, event)
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::with_prefix("[RetryLogger]")
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, event: &RetryEvent) {
        println!("{}", self.render(event));
    }
}

/// Forwards events to `tracing` with structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, event: &RetryEvent) {
        match event {
            RetryEvent::Attempting { try_count, elapsed } => debug!(
                try_count,
                elapsed_ms = millis(*elapsed),
                "Invoking decorated operation"
            ),
            RetryEvent::Failed { try_count, error } => {
                warn!(try_count, error = %error, "Decorated operation failed")
            }
            RetryEvent::Retrying { try_count, wait } => info!(
                try_count,
                wait_ms = millis(*wait),
                "Scheduling retry"
            ),
            RetryEvent::Succeeded { try_count } => {
                info!(try_count, "Decorated operation succeeded")
            }
            RetryEvent::Rejected { try_count, error } => {
                warn!(try_count, error = %error, "Error is not retryable")
            }
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Install a `tracing-subscriber` formatter honoring `RUST_LOG`.
///
/// Intended for binaries and examples; libraries should leave subscriber
/// setup to the application. Returns an error if a global subscriber is
/// already installed.
#[cfg(feature = "trace")]
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,insistent=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).try_init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::from_nanos(u64::MAX)), 18_446_744_073_709);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_event_display() {
        let event = RetryEvent::Retrying {
            try_count: 2,
            wait: Duration::from_millis(1500),
        };
        assert_eq!(
            event.to_string(),
            "Decorated function tries count: #2 | Retrying in 1.500 seconds"
        );

        let event = RetryEvent::Failed {
            try_count: 1,
            error: "boom".to_string(),
        };
        assert_eq!(event.to_string(), "Operation failed: boom");
        assert_eq!(event.try_count(), 1);
    }

    #[test]
    fn test_closure_logger() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let logger = move |event: &RetryEvent| sink.lock().unwrap().push(event.clone());

        logger.log(&RetryEvent::Succeeded { try_count: 3 });

        assert_eq!(
            *seen.lock().unwrap(),
            vec![RetryEvent::Succeeded { try_count: 3 }]
        );
    }

    #[test]
    fn test_console_prefix() {
        let logger = ConsoleLogger::default();
        assert_eq!(
            logger.render(&RetryEvent::Succeeded { try_count: 1 }),
            "[RetryLogger] Decorated function returned a value successfully."
        );

        let logger = ConsoleLogger::with_prefix(">>");
        assert!(
            logger
                .render(&RetryEvent::Succeeded { try_count: 1 })
                .starts_with(">> ")
        );
    }

    #[test]
    fn test_tracing_logger_accepts_every_event() {
        let logger = TracingLogger;
        for event in [
            RetryEvent::Attempting {
                try_count: 1,
                elapsed: Duration::ZERO,
            },
            RetryEvent::Failed {
                try_count: 1,
                error: "e".to_string(),
            },
            RetryEvent::Retrying {
                try_count: 1,
                wait: Duration::from_secs(1),
            },
            RetryEvent::Retrying {
                try_count: 2,
                wait: Duration::MAX,
            },
            RetryEvent::Succeeded { try_count: 2 },
            RetryEvent::Rejected {
                try_count: 2,
                error: "fatal".to_string(),
            },
        ] {
            logger.log(&event);
        }
    }
}
