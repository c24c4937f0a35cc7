//! Frame types and JPEG encoding

pub mod encoder;
pub mod frame;

pub use encoder::{FrameEncoder, JpegFrameEncoder};
pub use frame::{Frame, PixelFormat, RawFrame};
