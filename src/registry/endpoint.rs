//! Endpoint: one listening socket and its viewers
//!
//! All socket work for an endpoint happens inside [`EndpointState::run_round`],
//! under the endpoint's lock. A round is:
//!
//! 1. accept at most one pending connection (zero-timeout poll)
//! 2. read and answer pending requests (zero-timeout reads)
//! 3. select receivers: streaming, same channel, client delay elapsed
//! 4. unless the channel was broadcast less than `min_delay` ago, encode once
//!    at the highest requested quality and write the chunk to every receiver

use std::collections::BTreeMap;
use std::future::poll_fn;
use std::net::SocketAddr;
use std::task::Poll;
use std::time::Instant;

use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::{Mutex, MutexGuard};

use super::key::EndpointKey;
use crate::error::{DropReason, RelayError, Result};
use crate::media::{Frame, FrameEncoder};
use crate::protocol::constants::{LISTEN_BACKLOG, MAX_REQUEST_SIZE};
use crate::protocol::frame_chunk;
use crate::server::config::RelayConfig;
use crate::session::{ClientOutcome, ClientRecord, ClientSnapshot};
use crate::stats::EndpointStats;

/// Outcome of one broadcast call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Addresses of the clients registered after the round
    pub clients: Vec<SocketAddr>,
    /// Bytes written during the round (stream headers and frame chunks)
    pub bytes_sent: usize,
}

/// A listening socket bound to one `(host, port)`
#[derive(Debug)]
pub struct Endpoint {
    key: EndpointKey,
    local_addr: SocketAddr,
    state: Mutex<EndpointState>,
}

impl Endpoint {
    /// Bind and listen on `addr` with address reuse enabled
    pub(crate) fn bind(key: EndpointKey, addr: SocketAddr) -> Result<Self> {
        let bind_err = |source| RelayError::Bind { addr, source };

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_err)?;
        socket.set_reuseaddr(true).map_err(bind_err)?;
        socket.bind(addr).map_err(bind_err)?;
        let listener = socket.listen(LISTEN_BACKLOG).map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        Ok(Self {
            state: Mutex::new(EndpointState::new(key.clone(), listener)),
            key,
            local_addr,
        })
    }

    /// Endpoint identity
    pub fn key(&self) -> &EndpointKey {
        &self.key
    }

    /// Address the listener is actually bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Lock the endpoint state
    pub async fn lock(&self) -> MutexGuard<'_, EndpointState> {
        self.state.lock().await
    }
}

/// Mutable endpoint state, only reachable through [`Endpoint::lock`]
#[derive(Debug)]
pub struct EndpointState {
    key: EndpointKey,
    /// `None` once the endpoint is shut down
    listener: Option<TcpListener>,
    /// Every channel seen, with the time of its last broadcast
    channels: BTreeMap<String, Option<Instant>>,
    clients: BTreeMap<SocketAddr, ClientRecord>,
    stats: EndpointStats,
}

impl EndpointState {
    fn new(key: EndpointKey, listener: TcpListener) -> Self {
        Self {
            key,
            listener: Some(listener),
            channels: BTreeMap::new(),
            clients: BTreeMap::new(),
            stats: EndpointStats::new(),
        }
    }

    /// Whether the endpoint has been shut down
    pub fn is_closed(&self) -> bool {
        self.listener.is_none()
    }

    /// Channel names seen so far, sorted
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Snapshots of all registered clients, ordered by address
    pub fn clients(&self) -> Vec<ClientSnapshot> {
        self.clients.values().map(ClientRecord::snapshot).collect()
    }

    /// Current statistics
    pub fn stats(&self) -> EndpointStats {
        let mut stats = self.stats.clone();
        stats.active_clients = self.clients.len();
        stats
    }

    /// Run one broadcast round for `frame` on `channel`
    ///
    /// Client failures only remove that client. An encoder failure aborts
    /// the round and is returned; the endpoint stays usable.
    pub async fn run_round(
        &mut self,
        frame: &Frame,
        channel: &str,
        config: &RelayConfig,
        encoder: &dyn FrameEncoder,
    ) -> Result<BroadcastReport> {
        let now = Instant::now();
        self.stats.rounds += 1;
        if !self.channels.contains_key(channel) {
            self.channels.insert(channel.to_string(), None);
        }

        self.accept_pending(now, config).await;
        if self.clients.is_empty() {
            return Ok(BroadcastReport::default());
        }

        let mut bytes_sent = self.service_requests(config).await;

        let receivers: Vec<SocketAddr> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_receiver(channel, now))
            .map(|(addr, _)| *addr)
            .collect();

        let rate_limited = self
            .channels
            .get(channel)
            .copied()
            .flatten()
            .is_some_and(|last| now.saturating_duration_since(last) < config.min_delay);

        if receivers.is_empty() || rate_limited {
            if !receivers.is_empty() {
                self.stats.rate_limited += 1;
            }
            return Ok(self.finish_round(bytes_sent));
        }

        let quality = receivers
            .iter()
            .filter_map(|addr| self.clients.get(addr))
            .map(|client| client.negotiation.quality)
            .max()
            .unwrap_or(config.default_quality);

        self.stats.encodes += 1;
        let jpeg = match encoder.encode(frame, quality) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                tracing::warn!(
                    endpoint = %self.key,
                    channel = channel,
                    quality = quality,
                    error = %e,
                    "Frame encoding failed"
                );
                self.stats.bytes_sent += bytes_sent as u64;
                return Err(e.into());
            }
        };
        let chunk = frame_chunk(&jpeg, &config.extra_headers);

        for addr in &receivers {
            let Some(client) = self.clients.get_mut(addr) else {
                continue;
            };
            match client.send_frame(&chunk, config, now).await {
                Ok(written) => bytes_sent += written,
                Err(reason) => self.drop_client(addr, reason),
            }
        }

        if let Some(last) = self.channels.get_mut(channel) {
            *last = Some(now);
        }
        self.stats.frames_broadcast += 1;

        tracing::trace!(
            endpoint = %self.key,
            channel = channel,
            receivers = receivers.len(),
            quality = quality,
            jpeg_bytes = jpeg.len(),
            "Frame broadcast"
        );

        Ok(self.finish_round(bytes_sent))
    }

    /// Close every client socket and the listener
    pub(crate) fn shutdown(&mut self) {
        let clients = std::mem::take(&mut self.clients);
        self.listener = None;

        tracing::info!(
            endpoint = %self.key,
            clients = clients.len(),
            "Endpoint shut down"
        );
    }

    async fn accept_pending(&mut self, now: Instant, config: &RelayConfig) {
        let Some(listener) = self.listener.as_ref() else {
            return;
        };

        match poll_fn(|cx| Poll::Ready(listener.poll_accept(cx))).await {
            Poll::Ready(Ok((stream, peer_addr))) => {
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::debug!(peer = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
                }
                self.stats.total_connections += 1;
                self.clients
                    .insert(peer_addr, ClientRecord::accept(stream, peer_addr, now, config));

                tracing::debug!(endpoint = %self.key, peer = %peer_addr, "Client accepted");
            }
            Poll::Ready(Err(e)) => {
                tracing::error!(endpoint = %self.key, error = %e, "Failed to accept connection");
            }
            Poll::Pending => {}
        }
    }

    async fn service_requests(&mut self, config: &RelayConfig) -> usize {
        let mut buf = [0u8; MAX_REQUEST_SIZE];
        let mut written = 0;

        let addrs: Vec<SocketAddr> = self.clients.keys().copied().collect();
        for addr in addrs {
            let Some(client) = self.clients.get_mut(&addr) else {
                continue;
            };
            let request = match client.poll_request(&mut buf) {
                None => continue,
                Some(Ok(request)) => request,
                Some(Err(reason)) => {
                    self.drop_client(&addr, reason);
                    continue;
                }
            };

            tracing::debug!(
                endpoint = %self.key,
                peer = %addr,
                request_target = ?request.target,
                "Client request"
            );

            let channels = self.channels.keys().map(String::as_str);
            match client.on_request(&request, channels, config).await {
                ClientOutcome::Continue { written: n } => written += n,
                ClientOutcome::Drop(reason) => self.drop_client(&addr, reason),
                ClientOutcome::Shutdown => {
                    self.clients.remove(&addr);
                    self.stats.directory_pages += 1;
                    tracing::debug!(endpoint = %self.key, peer = %addr, "Directory page served");
                }
            }
        }

        written
    }

    fn drop_client(&mut self, addr: &SocketAddr, reason: DropReason) {
        if self.clients.remove(addr).is_some() {
            self.stats.dropped_clients += 1;
            tracing::debug!(
                endpoint = %self.key,
                peer = %addr,
                reason = %reason,
                "Client dropped"
            );
        }
    }

    fn finish_round(&mut self, bytes_sent: usize) -> BroadcastReport {
        self.stats.bytes_sent += bytes_sent as u64;
        BroadcastReport {
            clients: self.clients.keys().copied().collect(),
            bytes_sent,
        }
    }
}
