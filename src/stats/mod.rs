//! Relay statistics

pub mod metrics;

pub use metrics::{ClientStats, EndpointStats};
