//! Wire types for the real-time telemetry feed.
//!
//! Every frame on the feed is a JSON object tagged by `type`. The payload
//! shape depends on the tag (`queries`, `sessions`, `waits`, `metrics`, ...)
//! and is kept as raw JSON here; consumers downcast per tag.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::errors::FeedError;

/// Liveness frame written periodically while a feed is open.
pub const PING_FRAME: &str = r#"{"type":"ping"}"#;

/// One parsed inbound frame from the telemetry feed.
///
/// Frames that do not carry at least a string `type` tag are rejected by
/// [`InboundMessage::parse`] and never reach consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Message kind, e.g. `"queries"` or `"sessions"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Payload, shape depends on `kind`.
    #[serde(rename = "data", default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Server-side send time, epoch milliseconds.
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<f64>,
    /// Error text attached by the server, if any.
    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

impl InboundMessage {
    /// Parse one text frame. Malformed frames are reported, not buffered.
    pub fn parse(text: &str) -> Result<Self, FeedError> {
        serde_json::from_str(text).map_err(|e| FeedError::MalformedFrame {
            detail: e.to_string(),
        })
    }

    /// Whether the server flagged this message as an error report.
    pub fn is_error(&self) -> bool {
        self.error_text.is_some()
    }
}
