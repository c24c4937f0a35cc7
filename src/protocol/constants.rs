//! Wire-level constants

/// Multipart boundary separating frames in the stream
pub const BOUNDARY: &str = "mjpegboundary";

/// Response sent once to a client before its first frame
pub const STREAM_HEADER: &[u8] = b"HTTP/1.0 200 OK\r\n\
Connection: close\r\n\
Content-Type: multipart/x-mixed-replace;boundary=mjpegboundary\r\n\
\r\n";

/// Status line and headers of the directory page response
pub const DIRECTORY_HEADER: &[u8] = b"HTTP/1.0 200 OK\r\n\
Connection: close\r\n\
Content-Type: text/html\r\n\
\r\n";

/// Path that always selects the directory page
pub const INDEX_PATH: &str = "index.html";

/// Upper bound of a single request read
pub const MAX_REQUEST_SIZE: usize = 1500;

/// Backlog of the endpoint listening socket
pub const LISTEN_BACKLOG: u32 = 5;

/// Lowest JPEG quality accepted by the encoder
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Highest JPEG quality accepted by the encoder
pub const MAX_JPEG_QUALITY: u8 = 100;
