//! Error types for the feed client and the REST collaborators.

use thiserror::Error;

/// Failures observed by the feed client.
///
/// None of these propagate out of the client's public operations; they are
/// logged and, where the lifecycle allows, handed to the `on_error` hook.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The configured address could not be parsed. Not retried automatically.
    #[error("invalid feed address {address:?}: {detail}")]
    InvalidAddress { address: String, detail: String },

    /// The transport failed at handshake or mid-stream.
    #[error("feed transport failure: {detail}")]
    Transport { detail: String },

    /// An inbound frame did not parse as a tagged message. Dropped locally,
    /// never surfaced through `on_error`.
    #[error("malformed feed frame dropped: {detail}")]
    MalformedFrame { detail: String },
}

/// Failures from the REST collaborator endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {endpoint}")]
    Status {
        status: reqwest::StatusCode,
        endpoint: String,
    },

    /// The session context holds no valid token (never logged in, logged
    /// out, or invalidated by a 401).
    #[error("session is not authenticated")]
    Unauthorized,
}
