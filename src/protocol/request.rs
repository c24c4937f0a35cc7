//! Client request parser
//!
//! Viewers are browsers or players that open `GET /?channel=..&quality=..&delay=..`.
//! Parsing is deliberately lenient and not RFC compliant:
//!
//! - the path is the token following the first `GET /`, if any
//! - parameters are every `key=value` pair (word characters only) found
//!   *anywhere* in the buffer, not only in the query string; later
//!   duplicates override earlier ones
//! - unknown parameters are ignored
//!
//! A buffer with no request line at all still yields its parameters.

use std::collections::HashMap;
use std::num::IntErrorKind;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ProtocolError;
use crate::protocol::constants::INDEX_PATH;

static REQUEST_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"GET /(\S*)").expect("valid request line pattern"));

static PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9A-Za-z_]+)=([0-9A-Za-z_]+)").expect("valid parameter pattern")
});

/// A parsed client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Raw token after `GET /` (path and query), `None` without a request line
    pub target: Option<String>,
    /// Target up to the first `?`
    pub path: String,
    /// Flat parameter map
    pub params: HashMap<String, String>,
}

impl Request {
    /// Parse a raw request buffer
    pub fn parse(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.is_empty() {
            return Err(ProtocolError::Empty);
        }
        let text = std::str::from_utf8(buf).map_err(|_| ProtocolError::InvalidUtf8)?;

        let target = REQUEST_LINE
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        let path = target
            .as_deref()
            .map(|t| t.split('?').next().unwrap_or_default().to_string())
            .unwrap_or_default();

        let params = PARAM
            .captures_iter(text)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
            .collect();

        Ok(Self {
            target,
            path,
            params,
        })
    }

    /// Get a parameter value
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Requested channel; `channel` wins over its `source` alias
    pub fn channel(&self) -> Option<&str> {
        self.param("channel").or_else(|| self.param("source"))
    }

    /// Requested quality, if present
    ///
    /// Oversized numbers saturate; the caller clamps to the configured maximum.
    pub fn quality(&self) -> Result<Option<u32>, ProtocolError> {
        self.param("quality")
            .map(|value| match value.parse::<u32>() {
                Ok(quality) => Ok(quality),
                Err(e) if *e.kind() == IntErrorKind::PosOverflow => Ok(u32::MAX),
                Err(_) => Err(ProtocolError::InvalidParam {
                    key: "quality",
                    value: value.to_string(),
                }),
            })
            .transpose()
    }

    /// Requested delay in milliseconds, if present
    pub fn delay_ms(&self) -> Result<Option<f64>, ProtocolError> {
        self.param("delay")
            .map(|value| match value.parse::<f64>() {
                Ok(ms) if ms.is_finite() && ms >= 0.0 => Ok(ms),
                _ => Err(ProtocolError::InvalidParam {
                    key: "delay",
                    value: value.to_string(),
                }),
            })
            .transpose()
    }

    /// Whether this request asks for the channel directory
    pub fn wants_directory(&self, default_channel_disabled: bool) -> bool {
        self.path == INDEX_PATH
            || (default_channel_disabled && self.target.as_deref() == Some(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stream_request() {
        let req = Request::parse(
            b"GET /?channel=0&quality=50&delay=20 HTTP/1.1\r\nHost: cam\r\n\r\n",
        )
        .unwrap();

        assert_eq!(req.target.as_deref(), Some("?channel=0&quality=50&delay=20"));
        assert_eq!(req.path, "");
        assert_eq!(req.channel(), Some("0"));
        assert_eq!(req.quality().unwrap(), Some(50));
        assert_eq!(req.delay_ms().unwrap(), Some(20.0));
    }

    #[test]
    fn test_parse_empty_is_error() {
        assert_eq!(Request::parse(b""), Err(ProtocolError::Empty));
    }

    #[test]
    fn test_parse_invalid_utf8_is_error() {
        assert_eq!(
            Request::parse(&[0x47, 0x45, 0x54, 0xFF, 0xFE]),
            Err(ProtocolError::InvalidUtf8)
        );
    }

    #[test]
    fn test_params_found_anywhere() {
        let req = Request::parse(b"hello quality=30 world\r\nX-Thing: source=cam2\r\n").unwrap();

        assert!(req.target.is_none());
        assert_eq!(req.path, "");
        assert_eq!(req.channel(), Some("cam2"));
        assert_eq!(req.quality().unwrap(), Some(30));
        assert_eq!(req.delay_ms().unwrap(), None);
    }

    #[test]
    fn test_channel_preferred_over_source() {
        let req = Request::parse(b"GET /?source=b&channel=a HTTP/1.0\r\n\r\n").unwrap();
        assert_eq!(req.channel(), Some("a"));
    }

    #[test]
    fn test_later_duplicate_wins() {
        let req = Request::parse(b"GET /?quality=10&quality=20 HTTP/1.0\r\n\r\n").unwrap();
        assert_eq!(req.quality().unwrap(), Some(20));
    }

    #[test]
    fn test_value_stops_at_non_word_character() {
        let req = Request::parse(b"GET /?delay=12.5&quality=-3 HTTP/1.0\r\n\r\n").unwrap();

        assert_eq!(req.delay_ms().unwrap(), Some(12.0));
        // `-3` does not start with a word character and is ignored
        assert_eq!(req.quality().unwrap(), None);
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let req = Request::parse(b"GET /?quality=high&delay=soon HTTP/1.0\r\n\r\n").unwrap();

        assert!(matches!(
            req.quality(),
            Err(ProtocolError::InvalidParam { key: "quality", .. })
        ));
        assert!(matches!(
            req.delay_ms(),
            Err(ProtocolError::InvalidParam { key: "delay", .. })
        ));
    }

    #[test]
    fn test_oversized_quality_saturates() {
        let req = Request::parse(b"GET /?quality=5000000000 HTTP/1.0\r\n\r\n").unwrap();
        assert_eq!(req.quality().unwrap(), Some(u32::MAX));

        let req = Request::parse(b"GET /?quality=99999999999999999999999999 HTTP/1.0\r\n\r\n")
            .unwrap();
        assert_eq!(req.quality().unwrap(), Some(u32::MAX));

        // Digits mixed with letters are still invalid
        let req = Request::parse(b"GET /?quality=50x HTTP/1.0\r\n\r\n").unwrap();
        assert!(req.quality().is_err());
    }

    #[test]
    fn test_non_finite_delay_rejected() {
        let req = Request::parse(b"GET /?delay=inf HTTP/1.0\r\n\r\n").unwrap();
        assert!(req.delay_ms().is_err());
    }

    #[test]
    fn test_wants_directory() {
        let index = Request::parse(b"GET /index.html HTTP/1.0\r\n\r\n").unwrap();
        assert!(index.wants_directory(false));
        assert!(index.wants_directory(true));

        let root = Request::parse(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        assert!(!root.wants_directory(false));
        assert!(root.wants_directory(true));

        let with_query = Request::parse(b"GET /?channel=1 HTTP/1.0\r\n\r\n").unwrap();
        assert!(!with_query.wants_directory(true));

        let no_line = Request::parse(b"channel=1").unwrap();
        assert!(!no_line.wants_directory(true));
    }
}
