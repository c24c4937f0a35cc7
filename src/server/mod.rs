//! Relay entry point and configuration

pub mod config;
pub mod relay;

pub use config::{RelayConfig, SendMode};
pub use relay::MjpegRelay;
