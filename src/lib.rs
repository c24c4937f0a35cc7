//! Motion-JPEG over HTTP relay
//!
//! Turns frames pushed by a producer (a camera callback, a decoder loop) into
//! live `multipart/x-mixed-replace` streams for any number of viewers. Each
//! viewer picks a channel, a JPEG quality and a refresh delay through its
//! request URL:
//!
//! ```text
//! http://<host>:<port>/?channel=<name>&quality=<1..100>&delay=<ms>
//! http://<host>:<port>/index.html          list of known channels
//! ```
//!
//! There are no background tasks. Every [`MjpegRelay::broadcast`] call
//! accepts pending connections, answers pending requests, and sends the frame
//! to the viewers that are due, encoding it at most once. Passing `None`
//! instead of a frame closes the endpoint.
//!
//! # Example
//!
//! ```no_run
//! use mjpeg_relay::{Frame, MjpegRelay, PixelFormat, RawFrame, RelayConfig};
//!
//! # async fn run() -> mjpeg_relay::Result<()> {
//! let relay = MjpegRelay::new();
//! let config = RelayConfig::default();
//!
//! let frame = Frame::from(RawFrame::new(320, 240, PixelFormat::Rgb8, vec![0u8; 320 * 240 * 3]));
//! let report = relay.broadcast(Some(&frame), "0", "", 8080, &config).await?;
//! println!("{} viewers, {} bytes", report.clients.len(), report.bytes_sent);
//!
//! relay.broadcast(None, "0", "", 8080, &config).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod media;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{DropReason, EncodeError, ProtocolError, RelayError, Result};
pub use media::{Frame, FrameEncoder, JpegFrameEncoder, PixelFormat, RawFrame};
pub use registry::{BroadcastReport, EndpointKey};
pub use server::{MjpegRelay, RelayConfig, SendMode};
pub use session::{ClientPhase, ClientSnapshot};
pub use stats::{ClientStats, EndpointStats};
