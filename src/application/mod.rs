pub mod feed_client;
pub mod monitors;

#[cfg(test)]
pub mod tests;

pub use feed_client::{ConnectionState, FeedClient};
pub use monitors::{MonitorKind, MonitorOptions, PerfMonitor};
