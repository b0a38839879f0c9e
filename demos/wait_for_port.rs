//! Block until a TCP port accepts connections.
use eventually::prelude::*;
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

fn main() -> Result<(), DeferredError> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    // Reserve a free port, release it, and bring a server up on it a little later.
    let addr = TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map_err(|e| DeferredError::unexpected("port reservation", e))?;
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(300));
        if let Ok(listener) = TcpListener::bind(addr) {
            for stream in listener.incoming().take(1) {
                drop(stream);
            }
        }
    });

    let connect = from_result(move || TcpStream::connect(addr)).named(format!("tcp://{addr}"));
    let constraint = TimeoutConstraint::builder()
        .max_total(Duration::from_secs(10))
        .max_polling(Duration::from_millis(100))
        .backoff(Backoff::random_exponential())
        .build()
        .expect("valid constraint");

    let stream = ensure(connect, constraint)?;
    let peer = stream.peer_addr().map_err(|e| DeferredError::unexpected("peer address", e))?;
    println!("connected to {peer}");
    Ok(())
}
