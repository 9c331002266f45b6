//! orapulse — resilient client for Oracle performance telemetry.
//!
//! The core is [`application::FeedClient`], a reconnecting JSON-over-WebSocket
//! subscription with capped linear backoff, heartbeat pings and a bounded
//! inbound buffer. Four [`application::PerfMonitor`] facades wrap it for the
//! live query, session, wait-event and metric streams, and
//! [`infrastructure::PerfApiClient`] covers the paginated REST reads.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod session;
