//! Reconnecting client for one logical telemetry subscription.
//!
//! The client keeps a best-effort stream alive over an unreliable WebSocket:
//! it reconnects with capped linear backoff after unexpected closes, pings the
//! server while open, and retains the most recent messages in a bounded
//! buffer. Consumers observe the connection through four optional hooks and
//! the read-only state accessors; no public operation returns an error.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::FeedConfig;
use crate::domain::errors::FeedError;
use crate::domain::message::{InboundMessage, PING_FRAME};

/// Most recent inbound messages retained per subscription.
pub const MESSAGE_BUFFER_CAPACITY: usize = 100;

/// Backoff multiplier ceiling: reconnect delay never exceeds five base
/// intervals, however many attempts have failed.
const BACKOFF_MULTIPLIER_CAP: u32 = 5;

/// Lifecycle states of one feed subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created, never connected.
    Idle,
    /// Transport handshake in flight.
    Connecting,
    /// Handshake succeeded; frames flow.
    Open,
    /// Closed, with no further reconnect scheduled to run unprompted.
    Closed,
    /// Transport-level failure observed; a close usually follows.
    Faulted,
}

/// Reconnect delay for the given attempt number (1-based).
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * attempt.clamp(1, BACKOFF_MULTIPLIER_CAP)
}

struct FeedClientInner {
    state: ConnectionState,
    last_message: Option<InboundMessage>,
    buffer: VecDeque<InboundMessage>,
    reconnect_attempts: u32,
    /// Set by `disconnect()`; suppresses every pending or future automatic
    /// reconnect until the caller connects again.
    intentionally_closed: bool,
    /// Bumped on every open and every disconnect. A task created for an
    /// earlier epoch must not drive transitions for the current one.
    epoch: u64,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    io_task: Option<JoinHandle<()>>,
    heartbeat_task: Option<JoinHandle<()>>,
    reconnect_task: Option<JoinHandle<()>>,
}

impl FeedClientInner {
    fn abort_timers(&mut self) {
        if let Some(task) = self.reconnect_task.take() {
            task.abort();
        }
        if let Some(task) = self.heartbeat_task.take() {
            task.abort();
        }
    }
}

impl Drop for FeedClientInner {
    // Teardown guarantee: once the last handle is gone no timer may fire and
    // the transport must close. Dropping the outbound sender tears down the
    // socket even if the io task was already gone.
    fn drop(&mut self) {
        self.abort_timers();
        if let Some(task) = self.io_task.take() {
            task.abort();
        }
        self.outbound = None;
    }
}

/// Handle to one feed subscription. Cheap to clone; all clones share the
/// same connection, buffer, and timers.
#[derive(Clone)]
pub struct FeedClient {
    config: Arc<FeedConfig>,
    inner: Arc<Mutex<FeedClientInner>>,
}

/// Non-owning handle used by spawned tasks, so a heartbeat or pending
/// reconnect timer never keeps a dropped client alive.
struct WeakFeed {
    config: Arc<FeedConfig>,
    inner: Weak<Mutex<FeedClientInner>>,
}

impl WeakFeed {
    fn upgrade(&self) -> Option<FeedClient> {
        self.inner.upgrade().map(|inner| FeedClient {
            config: Arc::clone(&self.config),
            inner,
        })
    }
}

impl FeedClient {
    /// Create a client for the given subscription. Must be called inside a
    /// tokio runtime. With `auto_connect` set, connection begins immediately.
    pub fn new(config: FeedConfig) -> Self {
        let auto_connect = config.auto_connect;
        let client = Self {
            config: Arc::new(config),
            inner: Arc::new(Mutex::new(FeedClientInner {
                state: ConnectionState::Idle,
                last_message: None,
                buffer: VecDeque::with_capacity(MESSAGE_BUFFER_CAPACITY),
                reconnect_attempts: 0,
                intentionally_closed: false,
                epoch: 0,
                outbound: None,
                io_task: None,
                heartbeat_task: None,
                reconnect_task: None,
            })),
        };
        if auto_connect {
            let starter = client.clone();
            tokio::spawn(async move {
                starter.connect().await;
            });
        }
        client
    }

    fn downgrade(&self) -> WeakFeed {
        WeakFeed {
            config: Arc::clone(&self.config),
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Open the transport. Idempotent: a client that is already open or
    /// mid-handshake is left alone. Failures surface through state, logging
    /// and `on_error`; they are never returned.
    pub async fn connect(&self) {
        let start_epoch = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                ConnectionState::Open => {
                    debug!(url = %self.config.url, "connect ignored: feed already open");
                    return;
                }
                ConnectionState::Connecting => {
                    debug!(url = %self.config.url, "connect ignored: handshake in flight");
                    return;
                }
                _ => {}
            }
            // No duplicate timers may survive into the new session.
            inner.abort_timers();
            inner.intentionally_closed = false;
            inner.state = ConnectionState::Connecting;
            inner.epoch
        };

        let url = match Url::parse(&self.config.url) {
            Ok(url) => url,
            Err(e) => {
                // Construction error: fault, no automatic retry.
                let err = FeedError::InvalidAddress {
                    address: self.config.url.clone(),
                    detail: e.to_string(),
                };
                error!(%err, "feed connect failed");
                let mut inner = self.inner.lock().await;
                if inner.epoch == start_epoch {
                    inner.state = ConnectionState::Faulted;
                }
                drop(inner);
                self.fire_error(&err);
                return;
            }
        };

        debug!(url = %url, "opening feed transport");
        match connect_async(url.as_str()).await {
            Ok((ws, _)) => self.on_transport_open(ws, start_epoch).await,
            Err(e) => {
                let err = FeedError::Transport {
                    detail: e.to_string(),
                };
                warn!(url = %url, %err, "feed handshake failed");
                {
                    let mut inner = self.inner.lock().await;
                    if inner.epoch != start_epoch {
                        return;
                    }
                    inner.state = ConnectionState::Faulted;
                }
                self.fire_error(&err);
                // The close path drives reconnection, as it does for a
                // connection that drops after opening.
                self.finish_closed(start_epoch).await;
            }
        }
    }

    /// Terminate the subscription: suppress automatic reconnects, cancel all
    /// timers, close the transport. Idempotent.
    pub async fn disconnect(&self) {
        let was_open = {
            let mut inner = self.inner.lock().await;
            inner.intentionally_closed = true;
            inner.epoch += 1;
            inner.abort_timers();
            if let Some(task) = inner.io_task.take() {
                task.abort();
            }
            if let Some(outbound) = inner.outbound.take() {
                let _ = outbound.send(Message::Close(None));
            }
            let was_open = inner.state == ConnectionState::Open;
            inner.state = ConnectionState::Closed;
            was_open
        };
        if was_open {
            info!(url = %self.config.url, "feed disconnected");
            self.fire_close();
        }
    }

    /// User-initiated "retry now": tear down, forget prior failures, connect.
    pub async fn reconnect(&self) {
        self.disconnect().await;
        {
            let mut inner = self.inner.lock().await;
            inner.reconnect_attempts = 0;
        }
        self.connect().await;
    }

    /// Serialize and send a message while open. Anything else is dropped
    /// with a warning: no queueing, no error.
    pub async fn send_message<T: Serialize>(&self, message: &T) {
        match serde_json::to_string(message) {
            Ok(text) => self.send_raw(text).await,
            Err(e) => warn!(error = %e, "dropping unserializable outbound message"),
        }
    }

    /// Send an already-encoded text frame while open; dropped otherwise.
    pub async fn send_raw(&self, text: impl Into<String>) {
        let inner = self.inner.lock().await;
        if inner.state != ConnectionState::Open {
            warn!(
                state = ?inner.state,
                "dropping outbound frame: feed not open"
            );
            return;
        }
        if let Some(outbound) = &inner.outbound {
            let _ = outbound.send(Message::Text(text.into()));
        }
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.state == ConnectionState::Open
    }

    /// The most recently received message, if any.
    pub async fn last_message(&self) -> Option<InboundMessage> {
        self.inner.lock().await.last_message.clone()
    }

    /// Snapshot of the retained messages, oldest first.
    pub async fn buffer(&self) -> Vec<InboundMessage> {
        self.inner.lock().await.buffer.iter().cloned().collect()
    }

    /// Automatic reconnect attempts since the last successful open.
    pub async fn reconnect_attempts(&self) -> u32 {
        self.inner.lock().await.reconnect_attempts
    }

    async fn on_transport_open(
        &self,
        ws: tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        start_epoch: u64,
    ) {
        let (tx, rx) = mpsc::unbounded_channel::<Message>();
        let session_epoch = {
            let mut inner = self.inner.lock().await;
            if inner.epoch != start_epoch || inner.intentionally_closed {
                // disconnect() won the race against the handshake
                debug!(url = %self.config.url, "discarding transport opened after disconnect");
                return;
            }
            inner.epoch += 1;
            let session_epoch = inner.epoch;
            inner.state = ConnectionState::Open;
            inner.reconnect_attempts = 0;
            inner.outbound = Some(tx.clone());
            if !self.config.heartbeat_interval.is_zero() {
                inner.heartbeat_task = Some(spawn_heartbeat(
                    self.downgrade(),
                    tx,
                    self.config.heartbeat_interval,
                    session_epoch,
                ));
            }
            inner.io_task = Some(spawn_io_loop(self.downgrade(), ws, rx, session_epoch));
            session_epoch
        };
        info!(url = %self.config.url, epoch = session_epoch, "feed open");
        self.fire_open();
    }

    async fn on_frame(&self, text: &str) {
        let msg = match InboundMessage::parse(text) {
            Ok(msg) => msg,
            Err(err) => {
                error!(%err, "ignoring inbound frame");
                return;
            }
        };
        {
            let mut inner = self.inner.lock().await;
            inner.last_message = Some(msg.clone());
            inner.buffer.push_back(msg.clone());
            while inner.buffer.len() > MESSAGE_BUFFER_CAPACITY {
                inner.buffer.pop_front();
            }
        }
        self.fire_message(&msg);
    }

    async fn on_transport_error(&self, detail: String, epoch: u64) {
        let err = FeedError::Transport { detail };
        {
            let mut inner = self.inner.lock().await;
            if inner.epoch != epoch || inner.intentionally_closed {
                return;
            }
            inner.state = ConnectionState::Faulted;
        }
        warn!(url = %self.config.url, %err, "feed transport error");
        self.fire_error(&err);
    }

    /// Shared tail of every unexpected close: settle into `Closed` and, when
    /// allowed, schedule the next automatic reconnect.
    async fn finish_closed(&self, epoch: u64) {
        let scheduled = {
            let mut inner = self.inner.lock().await;
            if inner.epoch != epoch {
                return;
            }
            inner.abort_timers();
            inner.io_task = None;
            inner.outbound = None;
            inner.state = ConnectionState::Closed;

            if !inner.intentionally_closed
                && inner.reconnect_attempts < self.config.max_reconnect_attempts
            {
                inner.reconnect_attempts += 1;
                let attempt = inner.reconnect_attempts;
                let delay = backoff_delay(self.config.reconnect_interval, attempt);
                inner.reconnect_task = Some(spawn_reconnect_timer(self.downgrade(), delay));
                Some((attempt, delay))
            } else {
                None
            }
        };
        self.fire_close();
        match scheduled {
            Some((attempt, delay)) => info!(
                url = %self.config.url,
                attempt,
                max = self.config.max_reconnect_attempts,
                ?delay,
                "feed closed, reconnect scheduled"
            ),
            None => debug!(url = %self.config.url, "feed closed, no reconnect scheduled"),
        }
    }

    fn fire_open(&self) {
        if let Some(hook) = &self.config.on_open {
            hook();
        }
    }

    fn fire_close(&self) {
        if let Some(hook) = &self.config.on_close {
            hook();
        }
    }

    fn fire_error(&self, err: &FeedError) {
        if let Some(hook) = &self.config.on_error {
            hook(err);
        }
    }

    fn fire_message(&self, msg: &InboundMessage) {
        if let Some(hook) = &self.config.on_message {
            hook(msg);
        }
    }
}

/// Pump the socket: write queued outbound frames, dispatch inbound ones.
/// Ends, and drives the close path, when either direction shuts down.
fn spawn_io_loop(
    feed: WeakFeed,
    ws: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    mut rx: mpsc::UnboundedReceiver<Message>,
    epoch: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (mut sink, mut stream) = ws.split();
        loop {
            tokio::select! {
                outgoing = rx.recv() => match outgoing {
                    Some(frame) => {
                        if sink.send(frame).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let Some(client) = feed.upgrade() else { return };
                        client.on_frame(&text).await;
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = sink.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // pong, binary: nothing to do
                    Some(Err(e)) => {
                        let Some(client) = feed.upgrade() else { return };
                        client.on_transport_error(e.to_string(), epoch).await;
                        break;
                    }
                },
            }
        }
        let Some(client) = feed.upgrade() else { return };
        client.finish_closed(epoch).await;
    })
}

/// Periodic liveness ping while the session stays open.
fn spawn_heartbeat(
    feed: WeakFeed,
    tx: mpsc::UnboundedSender<Message>,
    period: Duration,
    epoch: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // interval fires immediately; the first ping waits a full period
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(client) = feed.upgrade() else { return };
            {
                let inner = client.inner.lock().await;
                if inner.epoch != epoch || inner.state != ConnectionState::Open {
                    return;
                }
            }
            if tx.send(Message::Text(PING_FRAME.to_string())).is_err() {
                return;
            }
            debug!(url = %client.config.url, "heartbeat ping sent");
        }
    })
}

/// One-shot backoff timer. Re-checks intent after the delay so a disconnect
/// that raced the schedule still wins.
fn spawn_reconnect_timer(feed: WeakFeed, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let Some(client) = feed.upgrade() else { return };
        {
            let mut inner = client.inner.lock().await;
            if inner.intentionally_closed {
                return;
            }
            // Running now; connect() must not abort this very task.
            inner.reconnect_task = None;
        }
        client.connect().await;
    })
}
