//! Example: retrying flaky operations with insistent
//!
//! This example demonstrates:
//! 1. Exponential backoff against an operation that recovers
//! 2. An operation that never recovers (the failure is absorbed)
//! 3. Stopping early on errors that are not worth retrying
//!
//! Run with:
//! ```bash
//! RUST_LOG=info cargo run -p insistent --example retry_example --features trace
//! ```

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use insistent::prelude::*;

/// A simulated API that fails the first few times
struct UnreliableApi {
    attempts: AtomicU32,
    fail_count: u32,
}

impl UnreliableApi {
    fn new(fail_count: u32) -> Self {
        Self {
            attempts: AtomicU32::new(0),
            fail_count,
        }
    }

    async fn call(&self, ctx: AttemptContext) -> Result<String, std::io::Error> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if attempt <= self.fail_count {
            println!(
                "  Attempt {}: FAILED (next wait {:?})",
                ctx.try_count, ctx.next_timeout
            );
            Err(std::io::Error::other(format!(
                "Transient error on attempt {attempt}"
            )))
        } else {
            println!("  Attempt {}: SUCCESS", ctx.try_count);
            Ok("API response data".to_string())
        }
    }
}

/// Example 1: Exponential backoff
async fn example_recovering(retry: &RetryDecorator) {
    println!("\n=== Example 1: Exponential backoff ===\n");

    let api = Arc::new(UnreliableApi::new(2));
    let start = Instant::now();

    let result = retry
        .run(|ctx| {
            let api = Arc::clone(&api);
            async move { api.call(ctx).await }
        })
        .await;

    println!("\nResult: {:?}", result);
    println!("Total time: {:?}", start.elapsed());
}

/// Example 2: Exhausting the schedule
async fn example_exhausted(retry: &RetryDecorator) {
    println!("\n=== Example 2: Schedule exhausted ===\n");

    let say_hello = retry.wrap(
        |(to, from): (&'static str, &'static str), ctx: AttemptContext| async move {
            println!("-- {from} says hello to {to}");
            println!(
                "-- Code has been tried {} times. Next timeout of {:?}.",
                ctx.try_count, ctx.next_timeout
            );
            Err::<u32, _>(std::io::Error::other("I want to fail because yes."))
        },
    );

    let result = say_hello.call(("John", "Jane")).await;
    println!("Result is {:?}", result);
}

/// Example 3: Non-retryable errors
async fn example_predicate(retry: &RetryDecorator) {
    println!("\n=== Example 3: Only retry network errors ===\n");

    let outcome = retry
        .wrap(|(): (), _ctx: AttemptContext| async {
            Err::<(), _>(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "auth failed",
            ))
        })
        .retry_if(|err: &std::io::Error| err.kind() != std::io::ErrorKind::PermissionDenied)
        .call_detailed(())
        .await;

    println!("Attempts: {}", outcome.attempts());
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    insistent::init_tracing()?;

    let retry = RetryDecoratorBuilder::new()
        .set_initial_timeout(Duration::from_millis(100))?
        .set_retries(3)?
        .set_logger(Some(Arc::new(ConsoleLogger::with_prefix("[RetryLogger]"))))
        .set_strategy(StrategyKind::Exponential { factor: 2.0 })?
        .build()?;

    example_recovering(&retry).await;
    example_exhausted(&retry).await;

    let quiet = RetrySettings::from_env()?.build()?;
    example_predicate(&quiet).await;

    Ok(())
}
