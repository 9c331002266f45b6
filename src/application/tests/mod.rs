//! Integration tests for the feed client, run against an in-process
//! WebSocket server.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

pub mod mock_feed_server;

mod feed_connection_tests;

pub use mock_feed_server::MockFeedServer;

/// Poll `check` until it reports true or `timeout` elapses.
pub async fn eventually<F, Fut>(what: &str, timeout: Duration, check: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check().await {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out after {timeout:?} waiting for {what}");
}
