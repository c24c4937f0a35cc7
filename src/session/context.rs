//! Client snapshots
//!
//! Read-only copies of client records, handed out without exposing the
//! sockets owned by the endpoint.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use super::state::ClientPhase;
use crate::stats::ClientStats;

/// Point-in-time view of one client
#[derive(Debug, Clone)]
pub struct ClientSnapshot {
    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Lifecycle phase
    pub phase: ClientPhase,

    /// Negotiated channel
    pub channel: Option<String>,

    /// Negotiated JPEG quality
    pub quality: u8,

    /// Negotiated minimum interval between frames
    pub delay: Duration,

    /// Accept time
    pub connected_at: Instant,

    /// Accept time, or time of the last frame written
    pub last_sent: Instant,

    /// Counters
    pub stats: ClientStats,
}

impl ClientSnapshot {
    /// Whether the stream header has been sent
    pub fn is_streaming(&self) -> bool {
        self.phase == ClientPhase::HeadersSent
    }

    /// Connection age
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
