//! MAPI/HTTP response envelope.
//!
//! ```text
//! PROCESSING\r\n          <- zero or more meta-tags while the server works
//! PENDING\r\n
//! DONE\r\n                <- last meta-tag
//! X-ElapsedTime: 12\r\n   <- additional headers
//! X-StartTime: ...\r\n
//! \r\n                    <- end of headers
//! <binary response body>
//! ```

use bytes::Bytes;

use super::error::TransportError;

/// One meta-tag line preceding `DONE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaTag {
    /// Request is being processed.
    Processing,
    /// Keep-alive while the server waits.
    Pending,
}

/// Parsed response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkedResponse {
    meta_tags: Vec<MetaTag>,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl ChunkedResponse {
    /// Parse the envelope out of a raw response body.
    pub fn parse(raw: &Bytes) -> Result<Self, TransportError> {
        let mut offset = 0;
        let mut meta_tags = Vec::new();

        loop {
            let line = next_line(raw, &mut offset)?;
            match line {
                b"PROCESSING" => meta_tags.push(MetaTag::Processing),
                b"PENDING" => meta_tags.push(MetaTag::Pending),
                b"DONE" => break,
                _ => {
                    return Err(TransportError::MalformedEnvelope {
                        reason: "unknown meta-tag",
                    });
                }
            }
        }

        let mut headers = Vec::new();
        loop {
            let line = next_line(raw, &mut offset)?;
            if line.is_empty() {
                break;
            }
            let text = std::str::from_utf8(line).map_err(|_| TransportError::MalformedEnvelope {
                reason: "header line is not utf-8",
            })?;
            let (name, value) = text
                .split_once(':')
                .ok_or(TransportError::MalformedEnvelope {
                    reason: "header line without colon",
                })?;
            headers.push((name.trim().to_owned(), value.trim().to_owned()));
        }

        Ok(Self {
            meta_tags,
            headers,
            body: raw.slice(offset..),
        })
    }

    /// Meta-tags seen before `DONE`.
    #[must_use]
    pub fn meta_tags(&self) -> &[MetaTag] {
        &self.meta_tags
    }

    /// Additional headers in order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header with this name, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Binary response body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// Read one line ending in `\r\n` (a bare `\n` is accepted too).
fn next_line<'a>(raw: &'a [u8], offset: &mut usize) -> Result<&'a [u8], TransportError> {
    let rest = &raw[*offset..];
    let end = rest
        .iter()
        .position(|&b| b == b'\n')
        .ok_or(TransportError::MalformedEnvelope {
            reason: "truncated envelope",
        })?;
    *offset += end + 1;
    let line = &rest[..end];
    Ok(line.strip_suffix(b"\r").unwrap_or(line))
}

/// Build an envelope around `body`; used by servers and test doubles.
#[must_use]
pub fn frame_response(meta_tags: &[MetaTag], headers: &[(&str, &str)], body: &[u8]) -> Bytes {
    let mut out = Vec::with_capacity(body.len() + 64);
    for tag in meta_tags {
        out.extend_from_slice(match tag {
            MetaTag::Processing => b"PROCESSING\r\n".as_slice(),
            MetaTag::Pending => b"PENDING\r\n".as_slice(),
        });
    }
    out.extend_from_slice(b"DONE\r\n");
    for (name, value) in headers {
        out.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    Bytes::from(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_envelope() {
        let raw = Bytes::from_static(
            b"PROCESSING\r\nPENDING\r\nDONE\r\nX-ElapsedTime: 3\r\nX-StartTime: now\r\n\r\n\x01\x02\r\n",
        );
        let parsed = ChunkedResponse::parse(&raw).unwrap();
        assert_eq!(parsed.meta_tags(), &[MetaTag::Processing, MetaTag::Pending]);
        assert_eq!(parsed.header("x-elapsedtime"), Some("3"));
        assert_eq!(parsed.body().as_ref(), b"\x01\x02\r\n");
    }

    #[test]
    fn test_body_may_contain_newlines() {
        let raw = frame_response(&[], &[], b"\n\n\0\n");
        let parsed = ChunkedResponse::parse(&raw).unwrap();
        assert!(parsed.meta_tags().is_empty());
        assert_eq!(parsed.body().as_ref(), b"\n\n\0\n");
    }

    #[test]
    fn test_missing_done() {
        let raw = Bytes::from_static(b"PROCESSING\r\n");
        assert_eq!(
            ChunkedResponse::parse(&raw).unwrap_err(),
            TransportError::MalformedEnvelope {
                reason: "truncated envelope"
            }
        );
    }

    #[test]
    fn test_unknown_meta_tag() {
        let raw = Bytes::from_static(b"WORKING\r\nDONE\r\n\r\n");
        assert!(matches!(
            ChunkedResponse::parse(&raw),
            Err(TransportError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn test_header_without_colon() {
        let raw = Bytes::from_static(b"DONE\r\nbogus\r\n\r\n");
        assert_eq!(
            ChunkedResponse::parse(&raw).unwrap_err(),
            TransportError::MalformedEnvelope {
                reason: "header line without colon"
            }
        );
    }
}
