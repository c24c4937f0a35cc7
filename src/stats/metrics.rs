//! Statistics for relay endpoints and their clients

use std::time::{Duration, Instant};

/// Per-client counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Frame chunks written to this client
    pub frames_sent: u64,
    /// Bytes written to this client (stream header included)
    pub bytes_sent: u64,
}

impl ClientStats {
    pub(crate) fn record_header(&mut self, bytes: usize) {
        self.bytes_sent += bytes as u64;
    }

    pub(crate) fn record_frame(&mut self, bytes: usize) {
        self.frames_sent += 1;
        self.bytes_sent += bytes as u64;
    }
}

/// Endpoint-wide counters
#[derive(Debug, Clone)]
pub struct EndpointStats {
    /// When the endpoint started listening
    pub started_at: Instant,
    /// Connections accepted since start
    pub total_connections: u64,
    /// Clients currently registered
    pub active_clients: usize,
    /// Broadcast rounds run
    pub rounds: u64,
    /// Rounds that encoded and sent a frame
    pub frames_broadcast: u64,
    /// Rounds with receivers that were held back by the channel rate limit
    pub rate_limited: u64,
    /// Encoder invocations
    pub encodes: u64,
    /// Bytes written to clients (headers and chunks)
    pub bytes_sent: u64,
    /// Clients removed after an error or a closed connection
    pub dropped_clients: u64,
    /// Directory pages served
    pub directory_pages: u64,
}

impl EndpointStats {
    /// Create stats for an endpoint starting now
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_connections: 0,
            active_clients: 0,
            rounds: 0,
            frames_broadcast: 0,
            rate_limited: 0,
            encodes: 0,
            bytes_sent: 0,
            dropped_clients: 0,
            directory_pages: 0,
        }
    }

    /// Time since the endpoint started listening
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Average outgoing bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.uptime().as_secs();
        if secs > 0 {
            (self.bytes_sent * 8) / secs
        } else {
            0
        }
    }
}

impl Default for EndpointStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_stats_counts() {
        let mut stats = ClientStats::default();
        stats.record_header(100);
        stats.record_frame(1_000);
        stats.record_frame(500);

        assert_eq!(stats.frames_sent, 2);
        assert_eq!(stats.bytes_sent, 1_600);
    }

    #[test]
    fn test_endpoint_stats_new() {
        let stats = EndpointStats::new();

        assert_eq!(stats.total_connections, 0);
        assert_eq!(stats.active_clients, 0);
        assert_eq!(stats.rounds, 0);
        assert_eq!(stats.frames_broadcast, 0);
        assert_eq!(stats.encodes, 0);
        assert_eq!(stats.bytes_sent, 0);
    }

    #[test]
    fn test_endpoint_bitrate_zero_uptime() {
        let mut stats = EndpointStats::new();
        stats.bytes_sent = 1_000_000;

        // Less than a second of uptime reports no bitrate yet
        assert_eq!(stats.bitrate(), 0);
    }

    #[test]
    fn test_endpoint_bitrate() {
        let mut stats = EndpointStats::new();
        stats.started_at = Instant::now() - Duration::from_secs(10);
        stats.bytes_sent = 1_000_000;

        assert_eq!(stats.bitrate(), 800_000);
    }
}
