//! Compile-time prelude coverage test.
use eventually::prelude::*;
use std::time::Duration;

#[test]
fn prelude_reexports_core_types() {
    let constraint = TimeoutConstraint::builder()
        .max_total(Duration::from_millis(100))
        .backoff(Backoff::constant(Duration::from_millis(1)).with_jitter(Jitter::None))
        .build()
        .expect("valid constraint");

    let doubled = Existing::new(21_u32).map(|n| n * 2);
    assert_eq!(ensure(doubled, constraint.clone()).expect("resolved"), 42);

    let parsed = from_result(|| "8080".parse::<u16>());
    assert!(ensure_that(parsed, |port| *port == 8080, constraint.clone()).expect("matched"));

    let never = from_option(|| None::<u8>);
    let err: DeferredError = ensure(never, constraint.clone()).expect_err("never resolves");
    assert_eq!(err.kind(), FailureKind::Permanent);

    eventually(from_fn(|| Attempt::Ready(true)), |ok| *ok, constraint).expect("eventually true");
}
