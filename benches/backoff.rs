use criterion::{black_box, criterion_group, criterion_main, Criterion};
use eventually::{
    ensure, from_fn, Attempt, Backoff, Ensured, InstantSleeper, Jitter, TimeoutConstraint,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn backoff_sequences(c: &mut Criterion) {
    let fibonacci = Backoff::fibonacci();
    c.bench_function("fibonacci_first_64", |b| {
        b.iter(|| black_box(fibonacci.delays().take(64).sum::<Duration>()));
    });

    let exponential = Backoff::exponential_default();
    c.bench_function("exponential_first_64", |b| {
        b.iter(|| black_box(exponential.delays().take(64).sum::<Duration>()));
    });

    let randomized = Backoff::fibonacci().with_jitter(Jitter::full());
    c.bench_function("random_fibonacci_first_64", |b| {
        b.iter(|| black_box(randomized.delays().take(64).sum::<Duration>()));
    });
}

fn retry_engine(c: &mut Criterion) {
    let constraint = TimeoutConstraint::builder()
        .max_total(Duration::from_secs(60))
        .backoff(Backoff::constant(Duration::from_millis(1)))
        .build()
        .unwrap();

    c.bench_function("ensure_ready_immediately", |b| {
        b.iter(|| black_box(ensure(from_fn(|| Attempt::Ready(1_u32)), constraint.clone())));
    });

    // Ten attempts per resolution, no real sleeping.
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let tenth = from_fn(move || {
        if (counter.fetch_add(1, Ordering::Relaxed) + 1) % 10 == 0 {
            Attempt::Ready(())
        } else {
            Attempt::NotYet
        }
    });
    let ensured = Ensured::new(tenth, constraint).with_sleeper(InstantSleeper);
    c.bench_function("ensure_ready_on_tenth_attempt", |b| {
        b.iter(|| black_box(ensured.resolve()));
    });
}

criterion_group!(benches, backoff_sequences, retry_engine);
criterion_main!(benches);
