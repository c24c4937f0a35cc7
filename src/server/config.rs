//! Relay configuration
//!
//! Negotiation defaults and limits applied to every client of an endpoint.
//! The configuration is passed with each broadcast call, so a producer may
//! change it between frames.

use std::time::Duration;

use crate::protocol::constants::{MAX_JPEG_QUALITY, MIN_JPEG_QUALITY};

/// How chunks are written to client sockets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendMode {
    /// Single non-blocking write per chunk; a partial write is not completed
    #[default]
    Once,
    /// Keep writing until the whole chunk is accepted by the socket, for at
    /// most [`RelayConfig::write_timeout`]
    All,
}

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Lower bound for any client delay, and the minimum interval between
    /// two broadcasts on the same channel
    pub min_delay: Duration,

    /// Delay assigned to newly accepted clients
    pub default_delay: Duration,

    /// Upper bound for a client's requested quality
    pub max_quality: u8,

    /// Quality assigned to newly accepted clients
    pub default_quality: u8,

    /// Channel assigned to newly accepted clients.
    ///
    /// `None` disables the default channel: a bare `GET /` is answered with
    /// the channel directory instead of a stream.
    pub default_channel: Option<String>,

    /// Extra headers appended to every frame chunk, in order
    pub extra_headers: Vec<(String, String)>,

    /// Socket write strategy
    pub send_mode: SendMode,

    /// Longest a [`SendMode::All`] write may wait on a client before the
    /// client is dropped
    pub write_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(10),
            default_delay: Duration::from_millis(40),
            max_quality: 95,
            default_quality: 80,
            default_channel: Some(String::new()),
            extra_headers: Vec::new(),
            send_mode: SendMode::Once,
            write_timeout: Duration::from_millis(250),
        }
    }
}

impl RelayConfig {
    /// Set the minimum delay
    pub fn min_delay(mut self, delay: Duration) -> Self {
        self.min_delay = delay;
        self
    }

    /// Set the default client delay
    pub fn default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// Set the maximum quality
    pub fn max_quality(mut self, quality: u8) -> Self {
        self.max_quality = quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY);
        self
    }

    /// Set the default client quality
    pub fn default_quality(mut self, quality: u8) -> Self {
        self.default_quality = quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY);
        self
    }

    /// Set the default channel
    pub fn default_channel(mut self, channel: impl Into<String>) -> Self {
        self.default_channel = Some(channel.into());
        self
    }

    /// Disable the default channel
    pub fn disable_default_channel(mut self) -> Self {
        self.default_channel = None;
        self
    }

    /// Append an extra header to every frame chunk
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Set the send mode
    pub fn send_mode(mut self, mode: SendMode) -> Self {
        self.send_mode = mode;
        self
    }

    /// Set the write timeout for [`SendMode::All`]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Whether a bare `GET /` should be answered with the directory page
    pub fn default_channel_disabled(&self) -> bool {
        self.default_channel.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();

        assert_eq!(config.min_delay, Duration::from_millis(10));
        assert_eq!(config.default_delay, Duration::from_millis(40));
        assert_eq!(config.max_quality, 95);
        assert_eq!(config.default_quality, 80);
        assert_eq!(config.default_channel.as_deref(), Some(""));
        assert!(config.extra_headers.is_empty());
        assert_eq!(config.send_mode, SendMode::Once);
        assert_eq!(config.write_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_builder_quality_clamped() {
        let config = RelayConfig::default().max_quality(0).default_quality(200);

        assert_eq!(config.max_quality, MIN_JPEG_QUALITY);
        assert_eq!(config.default_quality, MAX_JPEG_QUALITY);
    }

    #[test]
    fn test_builder_disable_default_channel() {
        let config = RelayConfig::default().disable_default_channel();
        assert!(config.default_channel_disabled());

        let config = config.default_channel("thermal");
        assert!(!config.default_channel_disabled());
        assert_eq!(config.default_channel.as_deref(), Some("thermal"));
    }

    #[test]
    fn test_builder_chaining() {
        let config = RelayConfig::default()
            .min_delay(Duration::from_millis(5))
            .default_delay(Duration::from_millis(100))
            .max_quality(70)
            .default_quality(60)
            .header("X-Camera", "gavin")
            .header("X-Frame", "rgb")
            .send_mode(SendMode::All)
            .write_timeout(Duration::from_secs(1));

        assert_eq!(config.min_delay, Duration::from_millis(5));
        assert_eq!(config.default_delay, Duration::from_millis(100));
        assert_eq!(config.max_quality, 70);
        assert_eq!(config.default_quality, 60);
        assert_eq!(
            config.extra_headers,
            vec![
                ("X-Camera".to_string(), "gavin".to_string()),
                ("X-Frame".to_string(), "rgb".to_string()),
            ]
        );
        assert_eq!(config.send_mode, SendMode::All);
        assert_eq!(config.write_timeout, Duration::from_secs(1));
    }
}
