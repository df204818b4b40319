//! Benchmarks for timeout sequence production and the retry loop overhead.

use std::hint::black_box;
use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use insistent::prelude::*;

fn strategy(kind: StrategyKind) -> Strategy {
    let config = RetryConfiguration::new(Duration::from_millis(100), 32).unwrap();
    Strategy::new(config, kind).unwrap()
}

fn bench_sequences(c: &mut Criterion) {
    let mut group = c.benchmark_group("timeout_sequence");

    for (name, kind) in [
        ("fixed", StrategyKind::Fixed),
        ("exponential", StrategyKind::Exponential { factor: 1.5 }),
        (
            "linear",
            StrategyKind::Linear {
                increment: Duration::from_millis(50),
            },
        ),
    ] {
        let strategy = strategy(kind);
        group.bench_function(name, |b| {
            b.iter(|| black_box(&strategy).timeouts().flatten().sum::<Duration>())
        });
    }

    group.finish();
}

fn bench_immediate_success(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let retry = RetryDecorator::new(
        strategy(StrategyKind::Fixed),
        std::sync::Arc::new(|_: &RetryEvent| {}),
    );

    c.bench_function("decorated_immediate_success", |b| {
        b.to_async(&runtime).iter(|| async {
            retry
                .run(|ctx| async move { Ok::<_, std::io::Error>(black_box(ctx.try_count)) })
                .await
        })
    });
}

criterion_group!(benches, bench_sequences, bench_immediate_success);
criterion_main!(benches);
