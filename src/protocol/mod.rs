//! Wire protocol
//!
//! A tiny subset of HTTP/1.0: one lenient request parser and the three
//! responses the relay ever sends (stream header, frame chunk, directory page).

pub mod constants;
pub mod request;
pub mod response;

pub use request::Request;
pub use response::{directory_page, frame_chunk};
