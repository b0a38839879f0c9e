//! Assert that background work eventually reaches a state.
use eventually::prelude::*;
use eventually::{from_atomic_usize, AssertionFailure};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), AssertionFailure> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let processed = Arc::new(AtomicUsize::new(0));
    let worker = processed.clone();
    tokio::spawn(async move {
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            worker.fetch_add(1, Ordering::SeqCst);
        }
    });

    let constraint = TimeoutConstraint::within(Duration::from_secs(5));
    let counter = from_atomic_usize(processed);
    tokio::task::spawn_blocking(move || eventually(counter, |n| *n == 5, constraint))
        .await
        .expect("assertion thread")?;

    println!("all five items processed");
    Ok(())
}
