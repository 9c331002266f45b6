pub mod errors;
pub mod message;
pub mod models;
pub mod telemetry_source;
