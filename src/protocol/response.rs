//! Response builders
//!
//! ```text
//! HTTP/1.0 200 OK                          <- STREAM_HEADER, once per client
//! Content-Type: multipart/x-mixed-replace;boundary=mjpegboundary
//!
//! --mjpegboundary                          <- frame_chunk(), once per round
//! Content-Type: image/jpeg
//! Content-Length: <n>
//! Cache-Control: no-cache
//! <extra headers>
//!
//! <n bytes of JPEG>
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::constants::{BOUNDARY, DIRECTORY_HEADER};

/// Build one multipart chunk around an encoded frame
///
/// The encoded bytes are copied once into the chunk; the returned `Bytes`
/// is then shared by every receiver of the round.
pub fn frame_chunk(jpeg: &[u8], extra_headers: &[(String, String)]) -> Bytes {
    let mut head = format!(
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nCache-Control: no-cache\r\n",
        BOUNDARY,
        jpeg.len()
    );
    for (name, value) in extra_headers {
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");

    let mut buf = BytesMut::with_capacity(head.len() + jpeg.len());
    buf.put_slice(head.as_bytes());
    buf.put_slice(jpeg);
    buf.freeze()
}

/// Build the directory page listing `channels` in the given order
pub fn directory_page<'a, I>(channels: I) -> Bytes
where
    I: IntoIterator<Item = &'a str>,
{
    let mut body =
        String::from("<html><head><title>Motion JPEG over HTTP</title></head><body>");
    for (i, name) in channels.into_iter().enumerate() {
        let name = escape_html(name);
        body.push_str(&format!(
            "<li><a href=\"/?channel={name}\">Channel {i} [{name}]</a>"
        ));
    }
    body.push_str("</body></html>\r\n");

    let mut buf = BytesMut::with_capacity(DIRECTORY_HEADER.len() + body.len());
    buf.put_slice(DIRECTORY_HEADER);
    buf.put_slice(body.as_bytes());
    buf.freeze()
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
