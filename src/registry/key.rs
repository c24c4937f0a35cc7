//! Endpoint identity

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::error::{RelayError, Result};

/// `(host, port)` pair identifying an endpoint
///
/// The key is the address the producer asked for, not the resolved one:
/// `("", 8080)` and `("0.0.0.0", 8080)` are distinct endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    /// Host name or IP literal; empty means all IPv4 interfaces
    pub host: String,
    /// TCP port; 0 lets the OS choose
    pub port: u16,
}

impl EndpointKey {
    /// Create a new endpoint key
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Resolve to the address to bind
    pub async fn resolve(&self) -> Result<SocketAddr> {
        if self.host.is_empty() {
            return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port));
        }
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }

        let resolve_err = |source| RelayError::Resolve {
            host: self.host.clone(),
            port: self.port,
            source,
        };
        let mut addrs = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(resolve_err)?;
        addrs.next().ok_or_else(|| {
            resolve_err(io::Error::new(
                io::ErrorKind::NotFound,
                "host resolved to no addresses",
            ))
        })
    }
}

impl std::fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
