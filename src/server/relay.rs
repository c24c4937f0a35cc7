//! Broadcast driver
//!
//! [`MjpegRelay::broadcast`] is called by the producer once per frame. It runs
//! the whole accept / negotiate / send sequence in the caller's task and
//! returns; nothing is spawned and nothing runs between calls.

use std::net::SocketAddr;
use std::sync::Arc;

use super::config::RelayConfig;
use crate::error::Result;
use crate::media::{Frame, FrameEncoder, JpegFrameEncoder};
use crate::registry::{BroadcastReport, EndpointKey, EndpointRegistry};
use crate::session::ClientSnapshot;
use crate::stats::EndpointStats;

/// Motion-JPEG relay serving any number of endpoints
pub struct MjpegRelay {
    registry: EndpointRegistry,
    encoder: Arc<dyn FrameEncoder>,
}

impl MjpegRelay {
    /// Create a relay using the default JPEG encoder
    pub fn new() -> Self {
        Self::with_encoder(Arc::new(JpegFrameEncoder))
    }

    /// Create a relay with a custom encoder backend
    pub fn with_encoder(encoder: Arc<dyn FrameEncoder>) -> Self {
        Self {
            registry: EndpointRegistry::new(),
            encoder,
        }
    }

    /// Get a reference to the endpoint registry
    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Feed one frame to the endpoint at `(host, port)`
    ///
    /// The endpoint is created on first use. Passing `None` as the frame
    /// shuts the endpoint down (a no-op if it does not exist) and returns an
    /// empty report.
    pub async fn broadcast(
        &self,
        frame: Option<&Frame>,
        channel: &str,
        host: &str,
        port: u16,
        config: &RelayConfig,
    ) -> Result<BroadcastReport> {
        let key = EndpointKey::new(host, port);

        let Some(frame) = frame else {
            self.shutdown_endpoint(&key).await;
            return Ok(BroadcastReport::default());
        };

        loop {
            let endpoint = self.registry.get_or_create(&key).await?;
            let mut state = endpoint.lock().await;
            if state.is_closed() {
                // Shut down while we waited for the lock; the next lookup
                // creates a fresh endpoint
                continue;
            }
            return state
                .run_round(frame, channel, config, self.encoder.as_ref())
                .await;
        }
    }

    /// Shut down the endpoint at `(host, port)`
    ///
    /// Returns `false` if there was nothing to shut down.
    pub async fn shutdown(&self, host: &str, port: u16) -> bool {
        self.shutdown_endpoint(&EndpointKey::new(host, port)).await
    }

    /// Shut down every endpoint
    pub async fn shutdown_all(&self) {
        for endpoint in self.registry.drain().await {
            endpoint.lock().await.shutdown();
        }
    }

    /// Address the endpoint's listener is bound to
    pub async fn local_addr(&self, host: &str, port: u16) -> Option<SocketAddr> {
        self.registry
            .get(&EndpointKey::new(host, port))
            .await
            .map(|endpoint| endpoint.local_addr())
    }

    /// Snapshots of the endpoint's clients
    pub async fn clients(&self, host: &str, port: u16) -> Vec<ClientSnapshot> {
        let Some(endpoint) = self.registry.get(&EndpointKey::new(host, port)).await else {
            return Vec::new();
        };
        let clients = endpoint.lock().await.clients();
        clients
    }

    /// Channel names seen by the endpoint, sorted
    pub async fn channels(&self, host: &str, port: u16) -> Vec<String> {
        let Some(endpoint) = self.registry.get(&EndpointKey::new(host, port)).await else {
            return Vec::new();
        };
        let channels = endpoint.lock().await.channels().map(str::to_string).collect();
        channels
    }

    /// Statistics of the endpoint
    pub async fn endpoint_stats(&self, host: &str, port: u16) -> Option<EndpointStats> {
        let endpoint = self.registry.get(&EndpointKey::new(host, port)).await?;
        let stats = endpoint.lock().await.stats();
        Some(stats)
    }

    /// Number of live endpoints
    pub async fn endpoint_count(&self) -> usize {
        self.registry.len().await
    }

    async fn shutdown_endpoint(&self, key: &EndpointKey) -> bool {
        // Unregister first so the registry lock is released before waiting
        // on a round that may be writing to slow clients
        match self.registry.remove(key).await {
            Some(endpoint) => {
                endpoint.lock().await.shutdown();
                true
            }
            None => false,
        }
    }
}

impl Default for MjpegRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MjpegRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MjpegRelay")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
