//! Frame representations accepted from producers
//!
//! Producers hand over either a decoded [`image::DynamicImage`] or a packed
//! pixel buffer straight from a capture driver. Both resolve to the same
//! `encode_jpeg` capability; neither is modified by encoding.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType};

use crate::error::EncodeError;
use crate::protocol::constants::{MAX_JPEG_QUALITY, MIN_JPEG_QUALITY};

/// Pixel layout of a [`RawFrame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit luminance
    Gray8,
    /// Packed 8-bit R, G, B
    Rgb8,
    /// Packed 8-bit B, G, R (OpenCV order)
    Bgr8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
        }
    }
}

/// Packed, row-major pixel buffer without padding
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Bytes,
}

impl RawFrame {
    /// Create a raw frame
    pub fn new(width: u32, height: u32, format: PixelFormat, data: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            format,
            data: data.into(),
        }
    }

    /// Expected buffer length for the declared geometry
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    fn encode_jpeg(&self, quality: u8) -> Result<Bytes, EncodeError> {
        let expected = self.expected_len();
        if self.data.len() != expected {
            return Err(EncodeError::BufferSize {
                expected,
                actual: self.data.len(),
            });
        }

        match self.format {
            PixelFormat::Gray8 => {
                encode_pixels(&self.data, self.width, self.height, ExtendedColorType::L8, quality)
            }
            PixelFormat::Rgb8 => {
                encode_pixels(&self.data, self.width, self.height, ExtendedColorType::Rgb8, quality)
            }
            PixelFormat::Bgr8 => {
                let mut rgb = self.data.to_vec();
                for px in rgb.chunks_exact_mut(3) {
                    px.swap(0, 2);
                }
                encode_pixels(&rgb, self.width, self.height, ExtendedColorType::Rgb8, quality)
            }
        }
    }
}

/// A frame handed to the relay by a producer
#[derive(Debug, Clone)]
pub enum Frame {
    /// Decoded image of any color type
    Image(DynamicImage),
    /// Packed buffer from a capture driver
    Raw(RawFrame),
}

impl Frame {
    /// Frame dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Frame::Image(img) => (img.width(), img.height()),
            Frame::Raw(raw) => (raw.width, raw.height),
        }
    }

    /// Compress the frame to JPEG at `quality` (clamped to 1..=100)
    ///
    /// Images without a JPEG-compatible layout (alpha, 16-bit, float) are
    /// converted to an 8-bit copy first.
    pub fn encode_jpeg(&self, quality: u8) -> Result<Bytes, EncodeError> {
        match self {
            Frame::Raw(raw) => raw.encode_jpeg(quality),
            Frame::Image(DynamicImage::ImageLuma8(gray)) => encode_pixels(
                gray.as_raw(),
                gray.width(),
                gray.height(),
                ExtendedColorType::L8,
                quality,
            ),
            Frame::Image(DynamicImage::ImageRgb8(rgb)) => encode_pixels(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
                quality,
            ),
            Frame::Image(other) if other.color().has_color() => {
                let rgb = other.to_rgb8();
                encode_pixels(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    ExtendedColorType::Rgb8,
                    quality,
                )
            }
            Frame::Image(other) => {
                let gray = other.to_luma8();
                encode_pixels(
                    gray.as_raw(),
                    gray.width(),
                    gray.height(),
                    ExtendedColorType::L8,
                    quality,
                )
            }
        }
    }
}

impl From<DynamicImage> for Frame {
    fn from(img: DynamicImage) -> Self {
        Frame::Image(img)
    }
}

impl From<RawFrame> for Frame {
    fn from(raw: RawFrame) -> Self {
        Frame::Raw(raw)
    }
}

fn encode_pixels(
    pixels: &[u8],
    width: u32,
    height: u32,
    color: ExtendedColorType,
    quality: u8,
) -> Result<Bytes, EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::EmptyFrame { width, height });
    }

    let mut out = Vec::new();
    let mut encoder =
        JpegEncoder::new_with_quality(&mut out, quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY));
    encoder.encode(pixels, width, height, color)?;

    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};

    use super::*;

    fn is_jpeg(data: &[u8]) -> bool {
        data.starts_with(&[0xFF, 0xD8]) && data.ends_with(&[0xFF, 0xD9])
    }

    #[test]
    fn test_raw_rgb_encodes() {
        let raw = RawFrame::new(4, 2, PixelFormat::Rgb8, vec![128u8; 4 * 2 * 3]);
        let jpeg = Frame::from(raw).encode_jpeg(80).unwrap();

        assert!(is_jpeg(&jpeg));
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 2));
    }

    #[test]
    fn test_raw_bgr_does_not_touch_source() {
        let data = Bytes::from(vec![1u8, 2, 3, 4, 5, 6]);
        let frame = Frame::from(RawFrame::new(2, 1, PixelFormat::Bgr8, data.clone()));

        frame.encode_jpeg(90).unwrap();

        match frame {
            Frame::Raw(raw) => assert_eq!(raw.data, data),
            Frame::Image(_) => unreachable!(),
        }
    }

    #[test]
    fn test_raw_size_mismatch() {
        let raw = RawFrame::new(4, 4, PixelFormat::Gray8, vec![0u8; 10]);
        let err = Frame::from(raw).encode_jpeg(80).unwrap_err();

        assert!(matches!(
            err,
            EncodeError::BufferSize {
                expected: 16,
                actual: 10
            }
        ));
    }

    #[test]
    fn test_empty_frame_rejected() {
        let raw = RawFrame::new(0, 4, PixelFormat::Gray8, Vec::new());
        let err = Frame::from(raw).encode_jpeg(80).unwrap_err();

        assert!(matches!(err, EncodeError::EmptyFrame { width: 0, height: 4 }));
    }

    #[test]
    fn test_dynamic_gray_and_rgba() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([200])));
        assert!(is_jpeg(&Frame::from(gray).encode_jpeg(50).unwrap()));

        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255])));
        assert!(is_jpeg(&Frame::from(rgba).encode_jpeg(50).unwrap()));
    }

    #[test]
    fn test_dynamic_gray16_converted() {
        let thermal: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_pixel(6, 3, Luma([40_000]));
        let frame = Frame::from(DynamicImage::ImageLuma16(thermal));

        assert_eq!(frame.dimensions(), (6, 3));
        assert!(is_jpeg(&frame.encode_jpeg(70).unwrap()));
    }

    #[test]
    fn test_quality_affects_size() {
        let pixels: Vec<u8> = (0..64 * 64 * 3).map(|i| (i * 7 % 251) as u8).collect();
        let frame = Frame::from(RawFrame::new(64, 64, PixelFormat::Rgb8, pixels));

        let low = frame.encode_jpeg(5).unwrap();
        let high = frame.encode_jpeg(100).unwrap();
        assert!(low.len() < high.len());
    }
}
