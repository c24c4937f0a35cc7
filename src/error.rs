//! Error types
//!
//! Errors surfaced to the frame producer are collected in [`RelayError`].
//! Per-client failures never leave a broadcast round; they end up as a
//! [`DropReason`] and the client is removed.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Result alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors returned from [`MjpegRelay`](crate::MjpegRelay) operations
#[derive(Debug, Error)]
pub enum RelayError {
    /// The endpoint host could not be resolved to a socket address
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Creating, binding or listening on the endpoint socket failed
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The encoder backend rejected the frame
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Errors raised while turning a frame into JPEG bytes
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Frame has a zero width or height
    #[error("frame has no pixels ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    /// Raw buffer length does not match the declared geometry
    #[error("raw frame buffer is {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    /// Backend failure
    #[error("jpeg encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Malformed client request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Zero-length request buffer
    #[error("empty request")]
    Empty,

    #[error("request is not valid UTF-8")]
    InvalidUtf8,

    /// A known parameter carries a value that is not a number
    #[error("invalid value for `{key}`: {value}")]
    InvalidParam { key: &'static str, value: String },
}

/// Why a client was removed from its endpoint
#[derive(Debug, Error)]
pub enum DropReason {
    /// Orderly close from the peer (zero-length read)
    #[error("connection closed by peer")]
    PeerClosed,

    /// Request could not be parsed or negotiated
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Socket buffer full; the client is not reading fast enough
    #[error("client stopped reading")]
    Stalled,

    /// Read or write failure on the client socket
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_error_converts_into_relay_error() {
        let err: RelayError = EncodeError::EmptyFrame {
            width: 0,
            height: 4,
        }
        .into();

        assert!(matches!(err, RelayError::Encode(EncodeError::EmptyFrame { .. })));
        assert_eq!(err.to_string(), "frame has no pixels (0x4)");
    }

    #[test]
    fn test_drop_reason_display() {
        let reason = DropReason::from(ProtocolError::InvalidParam {
            key: "quality",
            value: "high".into(),
        });
        assert_eq!(reason.to_string(), "invalid value for `quality`: high");
        assert_eq!(DropReason::PeerClosed.to_string(), "connection closed by peer");
        assert_eq!(DropReason::Stalled.to_string(), "client stopped reading");
    }
}
