//! Thin facades over [`FeedClient`], one per live data kind.
//!
//! A monitor only builds the target address for its endpoint and forwards to
//! the shared client; reconnection, heartbeat and buffering all live there.

use crate::application::feed_client::{ConnectionState, FeedClient};
use crate::config::FeedConfig;
use crate::domain::message::InboundMessage;

/// The four live subscription kinds exposed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorKind {
    Queries,
    Sessions,
    WaitEvents,
    Metrics,
}

impl MonitorKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            MonitorKind::Queries => "queries",
            MonitorKind::Sessions => "sessions",
            MonitorKind::WaitEvents => "waits",
            MonitorKind::Metrics => "metrics",
        }
    }
}

/// Query parameters appended to the monitor endpoint.
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Server-side poll period, seconds.
    pub poll_interval_secs: u64,
    /// Only report statements slower than this, when set.
    pub min_elapsed_secs: Option<u64>,
    /// Maximum rows per update.
    pub limit: usize,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            min_elapsed_secs: None,
            limit: 50,
        }
    }
}

/// One live monitor: a kind plus the feed client subscribed to it.
pub struct PerfMonitor {
    kind: MonitorKind,
    client: FeedClient,
}

impl PerfMonitor {
    /// Build a monitor with default feed settings and auto-connect on.
    pub fn new(base_url: &str, kind: MonitorKind, options: &MonitorOptions) -> Self {
        Self::with_feed_config(base_url, kind, options, |config| {
            config.with_auto_connect(true)
        })
    }

    /// Build a monitor, letting the caller adjust the feed configuration
    /// (hooks, intervals) before the client is constructed.
    pub fn with_feed_config(
        base_url: &str,
        kind: MonitorKind,
        options: &MonitorOptions,
        configure: impl FnOnce(FeedConfig) -> FeedConfig,
    ) -> Self {
        let address = build_address(base_url, kind, options);
        let config = configure(FeedConfig::new(address));
        Self {
            kind,
            client: FeedClient::new(config),
        }
    }

    pub fn queries(base_url: &str, options: &MonitorOptions) -> Self {
        Self::new(base_url, MonitorKind::Queries, options)
    }

    pub fn sessions(base_url: &str, options: &MonitorOptions) -> Self {
        Self::new(base_url, MonitorKind::Sessions, options)
    }

    pub fn wait_events(base_url: &str, options: &MonitorOptions) -> Self {
        Self::new(base_url, MonitorKind::WaitEvents, options)
    }

    pub fn metrics(base_url: &str, options: &MonitorOptions) -> Self {
        Self::new(base_url, MonitorKind::Metrics, options)
    }

    pub fn kind(&self) -> MonitorKind {
        self.kind
    }

    pub async fn connect(&self) {
        self.client.connect().await;
    }

    pub async fn disconnect(&self) {
        self.client.disconnect().await;
    }

    pub async fn reconnect(&self) {
        self.client.reconnect().await;
    }

    pub async fn state(&self) -> ConnectionState {
        self.client.state().await
    }

    pub async fn is_connected(&self) -> bool {
        self.client.is_connected().await
    }

    pub async fn last_message(&self) -> Option<InboundMessage> {
        self.client.last_message().await
    }

    pub async fn buffer(&self) -> Vec<InboundMessage> {
        self.client.buffer().await
    }

    /// The underlying feed client, for callers that need direct sends.
    pub fn client(&self) -> &FeedClient {
        &self.client
    }
}

/// Append the monitor's query parameters to its fixed logical endpoint. The
/// feed client treats the result as an opaque string.
fn build_address(base_url: &str, kind: MonitorKind, options: &MonitorOptions) -> String {
    let mut address = format!(
        "{}/{}?interval={}&limit={}",
        base_url.trim_end_matches('/'),
        kind.endpoint(),
        options.poll_interval_secs,
        options.limit
    );
    if let Some(threshold) = options.min_elapsed_secs {
        address.push_str(&format!("&min_elapsed={threshold}"));
    }
    address
}
