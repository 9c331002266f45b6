//! Configuration for feed subscriptions and the demo binary.

use std::time::Duration;

use crate::domain::errors::FeedError;
use crate::domain::message::InboundMessage;

/// Default base delay between automatic reconnect attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3000);
/// Default ceiling on automatic reconnect attempts.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;
/// Default liveness ping period. A zero interval disables the heartbeat.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(30_000);

pub type OpenHook = Box<dyn Fn() + Send + Sync>;
pub type CloseHook = Box<dyn Fn() + Send + Sync>;
pub type ErrorHook = Box<dyn Fn(&FeedError) + Send + Sync>;
pub type MessageHook = Box<dyn Fn(&InboundMessage) + Send + Sync>;

/// Per-subscription configuration, fixed at construction.
///
/// A caller wanting different settings constructs a new client; nothing here
/// is mutated after the feed client takes ownership.
pub struct FeedConfig {
    /// Transport endpoint. Treated as an opaque string by the client.
    pub url: String,
    /// Connect immediately on construction.
    pub auto_connect: bool,
    /// Base delay unit for reconnect backoff.
    pub reconnect_interval: Duration,
    /// Ceiling on consecutive automatic reconnect attempts.
    pub max_reconnect_attempts: u32,
    /// Liveness ping period; zero disables the heartbeat entirely.
    pub heartbeat_interval: Duration,
    pub(crate) on_open: Option<OpenHook>,
    pub(crate) on_close: Option<CloseHook>,
    pub(crate) on_error: Option<ErrorHook>,
    pub(crate) on_message: Option<MessageHook>,
}

impl FeedConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auto_connect: false,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            on_open: None,
            on_close: None,
            on_error: None,
            on_message: None,
        }
    }

    pub fn with_auto_connect(mut self, enabled: bool) -> Self {
        self.auto_connect = enabled;
        self
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_on_open(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Box::new(hook));
        self
    }

    pub fn with_on_close(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }

    pub fn with_on_error(mut self, hook: impl Fn(&FeedError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    pub fn with_on_message(
        mut self,
        hook: impl Fn(&InboundMessage) + Send + Sync + 'static,
    ) -> Self {
        self.on_message = Some(Box::new(hook));
        self
    }
}

/// Endpoint configuration for the demo binary, read from the environment.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Base WebSocket URL the monitor facades append their endpoints to.
    pub ws_base_url: String,
    /// Base URL of the REST collaborators.
    pub api_base_url: String,
}

impl MonitorConfig {
    pub fn from_env() -> Self {
        Self {
            ws_base_url: std::env::var("ORAPULSE_WS_URL")
                .unwrap_or_else(|_| "ws://127.0.0.1:8080/ws".to_string()),
            api_base_url: std::env::var("ORAPULSE_API_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8080/api".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = FeedConfig::new("ws://db-host/ws/queries");
        assert!(!config.auto_connect);
        assert_eq!(config.reconnect_interval, Duration::from_millis(3000));
        assert_eq!(config.max_reconnect_attempts, 10);
        assert_eq!(config.heartbeat_interval, Duration::from_millis(30_000));
        assert!(config.on_open.is_none());
        assert!(config.on_message.is_none());
    }

    #[test]
    fn builders_override_defaults() {
        let config = FeedConfig::new("ws://db-host/ws/waits")
            .with_auto_connect(true)
            .with_reconnect_interval(Duration::from_millis(100))
            .with_max_reconnect_attempts(3)
            .with_heartbeat_interval(Duration::ZERO);
        assert!(config.auto_connect);
        assert_eq!(config.reconnect_interval, Duration::from_millis(100));
        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.heartbeat_interval, Duration::ZERO);
    }
}
