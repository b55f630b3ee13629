//! Echo demo.
//!
//! Opens a session, writes a few messages on a bidirectional stream, prints
//! whatever comes back, then closes.
//!
//! Run with: cargo run --example echo -- https://your-relay.example/echo

use std::time::Duration;

use tracing_subscriber::EnvFilter;
use webtransport_ws::{CloseInfo, Session, SessionOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://echo.websocket.org/".to_string());

    let options = SessionOptions::new()
        .with_connect_timeout(Duration::from_secs(10))
        .with_idle_timeout(Duration::from_secs(2))
        .with_nodelay();

    let session = Session::with_options(&url, options)?;
    session.ready().await?;
    println!("Connected to {}", session.url());

    let mut stream = session.create_bidirectional_stream().await?;
    for i in 1..=3 {
        stream.writable().write(format!("message {i}")).await?;
    }

    // Ends once the server has been quiet for the idle timeout.
    while let Some(reply) = stream.readable().read().await {
        println!("<- {}", String::from_utf8_lossy(&reply));
    }

    session.close(Some(CloseInfo::new(4000, "demo finished")));
    let event = session.closed().await?;
    println!("Closed: code={} reason={:?}", event.code, event.reason);

    Ok(())
}
