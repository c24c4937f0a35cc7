//! Client state machine
//!
//! ```text
//!   accept ──► Accepted ──request──► HeadersSent ──request──► HeadersSent
//!                 │                      │    (re-negotiate, no header)
//!                 └──── error / EOF / directory page ────► removed
//! ```
//!
//! Removal is not a phase: the endpoint deletes the record (and with it the
//! socket) as soon as a handler returns anything other than
//! [`ClientOutcome::Continue`].

use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::context::ClientSnapshot;
use crate::error::{DropReason, ProtocolError};
use crate::protocol::constants::STREAM_HEADER;
use crate::protocol::{directory_page, Request};
use crate::server::config::{RelayConfig, SendMode};
use crate::stats::ClientStats;

/// Client lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPhase {
    /// Connection accepted, no request seen yet
    Accepted,
    /// Stream header sent; eligible for frames
    HeadersSent,
}

/// Result of handling one client event
#[derive(Debug)]
pub enum ClientOutcome {
    /// Keep the client; `written` bytes went out while handling the event
    Continue { written: usize },
    /// Remove the client silently
    Drop(DropReason),
    /// A final response was delivered; close and remove the client
    Shutdown,
}

/// Negotiated stream parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiation {
    /// Requested channel, `None` when no default exists and none was asked for
    pub channel: Option<String>,
    /// JPEG quality, never above the configured maximum once negotiated
    pub quality: u8,
    /// Minimum interval between two frames to this client
    pub delay: Duration,
}

impl Negotiation {
    /// Defaults for a freshly accepted client
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            channel: config.default_channel.clone(),
            quality: config.default_quality,
            delay: config.default_delay,
        }
    }

    /// Apply the parameters of a request
    ///
    /// Nothing changes when any parameter is invalid.
    pub fn apply(&mut self, request: &Request, config: &RelayConfig) -> Result<(), ProtocolError> {
        let quality = request
            .quality()?
            .unwrap_or(u32::from(self.quality))
            .min(u32::from(config.max_quality));

        let delay = match request.delay_ms()? {
            Some(ms) => Duration::try_from_secs_f64(ms / 1000.0).map_err(|_| {
                ProtocolError::InvalidParam {
                    key: "delay",
                    value: request.param("delay").unwrap_or_default().to_string(),
                }
            })?,
            None => self.delay,
        };

        // quality <= max_quality <= 100
        self.quality = quality as u8;
        self.delay = delay.max(config.min_delay);
        if let Some(channel) = request.channel() {
            self.channel = Some(channel.to_string());
        }

        Ok(())
    }
}

/// Per-connection record owned by an endpoint
#[derive(Debug)]
pub struct ClientRecord {
    stream: TcpStream,
    pub peer_addr: SocketAddr,
    pub phase: ClientPhase,
    pub negotiation: Negotiation,
    /// Accept time, then the time of the last frame written
    pub last_sent: Instant,
    pub connected_at: Instant,
    pub stats: ClientStats,
}

impl ClientRecord {
    /// Create a record for a newly accepted connection
    pub(crate) fn accept(
        stream: TcpStream,
        peer_addr: SocketAddr,
        now: Instant,
        config: &RelayConfig,
    ) -> Self {
        Self {
            stream,
            peer_addr,
            phase: ClientPhase::Accepted,
            negotiation: Negotiation::from_config(config),
            last_sent: now,
            connected_at: now,
            stats: ClientStats::default(),
        }
    }

    /// Read a pending request without waiting
    ///
    /// Returns `None` when the client has nothing to say this round.
    pub(crate) fn poll_request(&self, buf: &mut [u8]) -> Option<Result<Request, DropReason>> {
        match self.stream.try_read(buf) {
            Ok(0) => Some(Err(DropReason::PeerClosed)),
            Ok(n) => Some(Request::parse(&buf[..n]).map_err(DropReason::from)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => None,
            Err(e) => Some(Err(e.into())),
        }
    }

    /// Advance the state machine for one request
    pub(crate) async fn on_request<'a, I>(
        &mut self,
        request: &Request,
        channels: I,
        config: &RelayConfig,
    ) -> ClientOutcome
    where
        I: IntoIterator<Item = &'a str>,
    {
        if request.wants_directory(config.default_channel_disabled()) {
            let page = directory_page(channels);
            if let Err(reason) = write_with(&mut self.stream, &page, config).await {
                return ClientOutcome::Drop(reason);
            }
            let _ = self.stream.shutdown().await;
            return ClientOutcome::Shutdown;
        }

        if let Err(e) = self.negotiation.apply(request, config) {
            return ClientOutcome::Drop(e.into());
        }

        match self.phase {
            ClientPhase::HeadersSent => ClientOutcome::Continue { written: 0 },
            ClientPhase::Accepted => {
                match write_with(&mut self.stream, STREAM_HEADER, config).await {
                    Ok(written) => {
                        self.phase = ClientPhase::HeadersSent;
                        self.stats.record_header(written);
                        ClientOutcome::Continue { written }
                    }
                    Err(reason) => ClientOutcome::Drop(reason),
                }
            }
        }
    }

    /// Whether this client should get the current frame of `channel`
    pub fn is_receiver(&self, channel: &str, now: Instant) -> bool {
        self.phase == ClientPhase::HeadersSent
            && self.negotiation.channel.as_deref() == Some(channel)
            && now.saturating_duration_since(self.last_sent) >= self.negotiation.delay
    }

    /// Write one frame chunk
    pub(crate) async fn send_frame(
        &mut self,
        chunk: &[u8],
        config: &RelayConfig,
        now: Instant,
    ) -> Result<usize, DropReason> {
        let written = write_with(&mut self.stream, chunk, config).await?;
        self.last_sent = now;
        self.stats.record_frame(written);
        Ok(written)
    }

    /// Read-only view of this client
    pub fn snapshot(&self) -> ClientSnapshot {
        ClientSnapshot {
            peer_addr: self.peer_addr,
            phase: self.phase,
            channel: self.negotiation.channel.clone(),
            quality: self.negotiation.quality,
            delay: self.negotiation.delay,
            connected_at: self.connected_at,
            last_sent: self.last_sent,
            stats: self.stats,
        }
    }
}

/// Write without holding up the round on a client that stopped reading
async fn write_with(
    stream: &mut TcpStream,
    data: &[u8],
    config: &RelayConfig,
) -> Result<usize, DropReason> {
    match config.send_mode {
        SendMode::Once => match stream.try_write(data) {
            Ok(written) => Ok(written),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(DropReason::Stalled),
            Err(e) => Err(e.into()),
        },
        SendMode::All => match timeout(config.write_timeout, stream.write_all(data)).await {
            Ok(Ok(())) => Ok(data.len()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(DropReason::Stalled),
        },
    }
}
