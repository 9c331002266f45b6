use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use super::{eventually, MockFeedServer};
use crate::application::feed_client::{ConnectionState, FeedClient};
use crate::config::FeedConfig;

/// Base config for tests that exercise connection handling: fast reconnects,
/// heartbeat off so ping frames do not pollute the server's received log.
fn quiet_config(url: &str) -> FeedConfig {
    FeedConfig::new(url)
        .with_reconnect_interval(Duration::from_millis(100))
        .with_heartbeat_interval(Duration::ZERO)
}

async fn wait_open(client: &FeedClient) {
    let probe = client.clone();
    eventually("feed to open", Duration::from_secs(3), move || {
        let probe = probe.clone();
        async move { probe.is_connected().await }
    })
    .await;
}

#[tokio::test]
async fn connect_is_idempotent_while_open() {
    let server = MockFeedServer::start().await;
    let messages = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&messages);
    let client = FeedClient::new(quiet_config(&server.url()).with_on_message(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    client.connect().await;
    wait_open(&client).await;
    client.connect().await;
    client.connect().await;

    // one transport handle, one set of handlers
    assert_eq!(server.accepted_count(), 1);
    server.broadcast(r#"{"type":"queries","data":{"rows":[]}}"#).await;
    let counter = Arc::clone(&messages);
    eventually("frame delivery", Duration::from_secs(3), move || {
        let counter = Arc::clone(&counter);
        async move { counter.load(Ordering::SeqCst) >= 1 }
    })
    .await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(messages.load(Ordering::SeqCst), 1);
    assert_eq!(client.buffer().await.len(), 1);

    client.disconnect().await;
}

#[tokio::test]
async fn send_before_open_is_a_silent_no_op() {
    let server = MockFeedServer::start().await;
    let client = FeedClient::new(quiet_config(&server.url()));

    client.send_raw("dropped").await;
    client
        .send_message(&serde_json::json!({"type": "subscribe"}))
        .await;

    assert_eq!(client.state().await, ConnectionState::Idle);
    sleep(Duration::from_millis(100)).await;
    assert!(server.received().await.is_empty());
}

#[tokio::test]
async fn send_after_disconnect_is_dropped() {
    let server = MockFeedServer::start().await;
    let client = FeedClient::new(quiet_config(&server.url()));
    client.connect().await;
    wait_open(&client).await;
    client.disconnect().await;

    let before = server.received().await.len();
    client.send_raw("late frame").await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(server.received().await.len(), before);
}

#[tokio::test]
async fn outbound_frames_reach_the_server_while_open() {
    let server = MockFeedServer::start().await;
    let client = FeedClient::new(quiet_config(&server.url()));
    client.connect().await;
    wait_open(&client).await;

    client.send_message(&serde_json::json!({"type": "ack"})).await;
    client.send_raw("already encoded").await;

    let expected = vec![r#"{"type":"ack"}"#.to_string(), "already encoded".to_string()];
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while server.received().await != expected {
        assert!(
            tokio::time::Instant::now() < deadline,
            "outbound frames never reached the server: {:?}",
            server.received().await
        );
        sleep(Duration::from_millis(10)).await;
    }

    client.disconnect().await;
}

#[tokio::test]
async fn zero_heartbeat_interval_sends_no_pings() {
    let server = MockFeedServer::start().await;
    let client = FeedClient::new(quiet_config(&server.url()));
    client.connect().await;
    wait_open(&client).await;

    sleep(Duration::from_millis(1200)).await;
    assert!(
        server.received().await.is_empty(),
        "no liveness frames expected with heartbeat disabled"
    );
    client.disconnect().await;
}

#[tokio::test]
async fn heartbeat_pings_flow_while_open() {
    let server = MockFeedServer::start().await;
    let client = FeedClient::new(
        FeedConfig::new(server.url()).with_heartbeat_interval(Duration::from_millis(150)),
    );
    client.connect().await;
    wait_open(&client).await;

    sleep(Duration::from_millis(1000)).await;
    let pings: Vec<String> = server
        .received()
        .await
        .into_iter()
        .filter(|text| {
            serde_json::from_str::<serde_json::Value>(text)
                .map(|v| v["type"] == "ping")
                .unwrap_or(false)
        })
        .collect();
    assert!(pings.len() >= 3, "expected pings, got {}", pings.len());

    client.disconnect().await;
}

#[tokio::test]
async fn disconnect_is_idempotent_and_fires_close_once() {
    let server = MockFeedServer::start().await;
    let closes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&closes);
    let client = FeedClient::new(quiet_config(&server.url()).with_on_close(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    client.connect().await;
    wait_open(&client).await;

    client.disconnect().await;
    client.disconnect().await;

    assert_eq!(client.state().await, ConnectionState::Closed);
    assert!(!client.is_connected().await);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_address_faults_without_retry() {
    let errors = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&errors);
    let client = FeedClient::new(
        FeedConfig::new("not a valid address")
            .with_reconnect_interval(Duration::from_millis(50))
            .with_on_error(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
    );

    client.connect().await;
    assert_eq!(client.state().await, ConnectionState::Faulted);
    assert_eq!(errors.load(Ordering::SeqCst), 1);

    // construction errors are not retried automatically
    sleep(Duration::from_millis(300)).await;
    assert_eq!(client.state().await, ConnectionState::Faulted);
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}
