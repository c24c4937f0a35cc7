//! Encoder capability
//!
//! The relay encodes at most once per broadcast round through a
//! [`FrameEncoder`]. Backends are swappable; the default compresses with the
//! `image` crate's baseline JPEG encoder.

use bytes::Bytes;

use super::frame::Frame;
use crate::error::EncodeError;

/// Turns a frame into JPEG bytes at a given quality
///
/// Implementations must not retry internally and must report failures as
/// errors rather than returning partial data.
pub trait FrameEncoder: Send + Sync {
    fn encode(&self, frame: &Frame, quality: u8) -> Result<Bytes, EncodeError>;
}

/// Default encoder backed by [`Frame::encode_jpeg`]
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegFrameEncoder;

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&self, frame: &Frame, quality: u8) -> Result<Bytes, EncodeError> {
        frame.encode_jpeg(quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{PixelFormat, RawFrame};

    #[test]
    fn test_default_encoder() {
        let frame = Frame::from(RawFrame::new(2, 2, PixelFormat::Gray8, vec![0u8; 4]));
        let jpeg = JpegFrameEncoder.encode(&frame, 80).unwrap();

        assert!(jpeg.starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn test_encoder_is_object_safe() {
        let encoder: Box<dyn FrameEncoder> = Box::new(JpegFrameEncoder);
        let frame = Frame::from(RawFrame::new(2, 2, PixelFormat::Gray8, vec![0u8; 3]));

        assert!(encoder.encode(&frame, 80).is_err());
    }
}
