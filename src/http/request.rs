//! Request reading.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4)
//! - Parse the request line and headers under a size budget
//! - Read the body: Content-Length, chunked, or until EOF
//!
//! # Design Decisions
//! - Tolerant of bare LF line endings and folded header lines
//! - Header order and duplicates are preserved as received
//! - Without Content-Length or chunking, the body runs to connection close,
//!   bounded by the configured body limit

use std::io;
use std::net::SocketAddr;

use hyper::Method;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use uuid::Uuid;

use crate::error::{ProtocolError, UploadError};

/// Longest accepted chunk-size or trailer line.
const MAX_CHUNK_LINE: u64 = 1024;

/// Unique identifier for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, used in artifact names.
    pub fn short(&self) -> String {
        let mut simple = self.0.simple().to_string();
        simple.truncate(8);
        simple
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request line and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: Method,
    pub target: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    /// First header value with this (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Declared body length. Conflicting duplicates are an error.
    pub fn content_length(&self) -> Result<Option<usize>, ProtocolError> {
        let mut declared = None;
        for (_, value) in self
            .headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        {
            let length: usize = value
                .trim()
                .parse()
                .map_err(|_| ProtocolError::InvalidContentLength)?;
            match declared {
                Some(previous) if previous != length => {
                    return Err(ProtocolError::InvalidContentLength)
                }
                _ => declared = Some(length),
            }
        }
        Ok(declared)
    }

    pub fn is_chunked(&self) -> bool {
        self.header("transfer-encoding")
            .map(|value| {
                value
                    .rsplit(',')
                    .next()
                    .is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"))
            })
            .unwrap_or(false)
    }

    /// HTTP/1.0 clients never get an interim `100 Continue`.
    pub fn expects_continue(&self) -> bool {
        self.version != "HTTP/1.0"
            && self
                .header("expect")
                .is_some_and(|value| value.trim().eq_ignore_ascii_case("100-continue"))
    }

    /// Request target without query or fragment.
    pub fn path(&self) -> &str {
        self.target.split(['?', '#']).next().unwrap_or(&self.target)
    }
}

/// A fully received upload. Immutable once built.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub id: RequestId,
    pub head: RequestHead,
    pub body: Vec<u8>,
    pub remote: SocketAddr,
}

impl UploadRequest {
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.header(name)
    }
}

/// Read the request line and headers.
///
/// Returns `Ok(None)` when the peer closes before sending anything.
pub async fn read_head<R>(reader: &mut R, max_header_bytes: usize) -> Result<Option<RequestHead>, UploadError>
where
    R: AsyncBufRead + Unpin,
{
    let mut budget = max_header_bytes as u64;

    // Stray blank lines before the request line are ignored.
    let request_line = loop {
        match read_line(reader, &mut budget, max_header_bytes).await? {
            None => return Ok(None),
            Some(line) if line.is_empty() => continue,
            Some(line) => break line,
        }
    };
    let (method, target, version) = parse_request_line(&request_line)?;

    let mut headers: Vec<(String, String)> = Vec::new();
    loop {
        let line = read_line(reader, &mut budget, max_header_bytes)
            .await?
            .ok_or_else(|| UploadError::Transport(io::ErrorKind::UnexpectedEof.into()))?;
        if line.is_empty() {
            break;
        }

        if matches!(line[0], b' ' | b'\t') {
            let (_, value) = headers.last_mut().ok_or(ProtocolError::MalformedHeader)?;
            value.push(' ');
            value.push_str(String::from_utf8_lossy(&line).trim());
            continue;
        }

        headers.push(parse_header(&line)?);
    }

    Ok(Some(RequestHead {
        method,
        target,
        version,
        headers,
    }))
}

/// Read the body of `head` from `reader`, never exceeding `max_body_size`.
pub async fn read_body<R>(reader: &mut R, head: &RequestHead, max_body_size: usize) -> Result<Vec<u8>, UploadError>
where
    R: AsyncBufRead + Unpin,
{
    if head.is_chunked() {
        return read_chunked(reader, max_body_size).await;
    }

    match head.content_length()? {
        Some(length) if length > max_body_size => {
            Err(ProtocolError::BodyTooLarge { limit: max_body_size }.into())
        }
        Some(length) => {
            let mut body = vec![0u8; length];
            reader.read_exact(&mut body).await?;
            Ok(body)
        }
        None => {
            let mut body = Vec::new();
            (&mut *reader)
                .take(max_body_size as u64 + 1)
                .read_to_end(&mut body)
                .await?;
            if body.len() > max_body_size {
                return Err(ProtocolError::BodyTooLarge { limit: max_body_size }.into());
            }
            Ok(body)
        }
    }
}

async fn read_chunked<R>(reader: &mut R, max_body_size: usize) -> Result<Vec<u8>, UploadError>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = Vec::new();
    loop {
        let mut budget = MAX_CHUNK_LINE;
        let line = read_line(reader, &mut budget, MAX_CHUNK_LINE as usize)
            .await?
            .ok_or_else(|| UploadError::Transport(io::ErrorKind::UnexpectedEof.into()))?;
        let size = parse_chunk_size(&line)?;

        if size == 0 {
            // Trailer section, discarded.
            loop {
                let mut budget = MAX_CHUNK_LINE;
                match read_line(reader, &mut budget, MAX_CHUNK_LINE as usize).await? {
                    Some(line) if !line.is_empty() => continue,
                    _ => return Ok(body),
                }
            }
        }

        if body.len().saturating_add(size) > max_body_size {
            return Err(ProtocolError::BodyTooLarge { limit: max_body_size }.into());
        }
        let start = body.len();
        body.resize(start + size, 0);
        reader.read_exact(&mut body[start..]).await?;

        let mut budget = MAX_CHUNK_LINE;
        match read_line(reader, &mut budget, MAX_CHUNK_LINE as usize).await? {
            Some(line) if line.is_empty() => {}
            _ => return Err(ProtocolError::InvalidChunk.into()),
        }
    }
}

/// Read one line, stripping `\n` or `\r\n`. `None` on clean EOF.
async fn read_line<R>(reader: &mut R, budget: &mut u64, limit: usize) -> Result<Option<Vec<u8>>, UploadError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = (&mut *reader).take(*budget).read_until(b'\n', &mut line).await?;
    if read == 0 {
        if *budget == 0 {
            return Err(ProtocolError::HeadersTooLarge { limit }.into());
        }
        return Ok(None);
    }
    *budget -= read as u64;

    if line.last() != Some(&b'\n') {
        if *budget == 0 {
            return Err(ProtocolError::HeadersTooLarge { limit }.into());
        }
        return Err(UploadError::Transport(io::ErrorKind::UnexpectedEof.into()));
    }
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some(line))
}

fn parse_request_line(line: &[u8]) -> Result<(Method, String, String), ProtocolError> {
    let text = std::str::from_utf8(line).map_err(|_| ProtocolError::MalformedRequestLine)?;
    let mut parts = text.split_ascii_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ProtocolError::MalformedRequestLine);
    };
    if !version.starts_with("HTTP/") {
        return Err(ProtocolError::MalformedRequestLine);
    }
    let method = Method::from_bytes(method.as_bytes()).map_err(|_| ProtocolError::MalformedRequestLine)?;
    Ok((method, target.to_string(), version.to_string()))
}

fn parse_header(line: &[u8]) -> Result<(String, String), ProtocolError> {
    let colon = line
        .iter()
        .position(|&b| b == b':')
        .ok_or(ProtocolError::MalformedHeader)?;
    let name = std::str::from_utf8(&line[..colon]).map_err(|_| ProtocolError::MalformedHeader)?;
    if name.is_empty() || name.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control()) {
        return Err(ProtocolError::MalformedHeader);
    }
    let value = String::from_utf8_lossy(&line[colon + 1..]).trim().to_string();
    Ok((name.to_string(), value))
}

fn parse_chunk_size(line: &[u8]) -> Result<usize, ProtocolError> {
    let text = std::str::from_utf8(line).map_err(|_| ProtocolError::InvalidChunk)?;
    let digits = text.split(';').next().unwrap_or_default().trim();
    usize::from_str_radix(digits, 16).map_err(|_| ProtocolError::InvalidChunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn head_of(raw: &[u8]) -> Result<Option<RequestHead>, UploadError> {
        let mut reader = BufReader::new(raw);
        read_head(&mut reader, 1024).await
    }

    #[tokio::test]
    async fn parses_head_in_order() {
        let head = head_of(b"POST /upload/ecg.xml HTTP/1.1\r\nHost: 10.0.0.5\r\nContent-Length: 4\r\nX-A: 1\r\n\r\nbody")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(head.method, Method::POST);
        assert_eq!(head.target, "/upload/ecg.xml");
        assert_eq!(head.version, "HTTP/1.1");
        let names: Vec<_> = head.headers.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["Host", "Content-Length", "X-A"]);
        assert_eq!(head.content_length().unwrap(), Some(4));
    }

    #[tokio::test]
    async fn tolerates_bare_lf_and_folding() {
        let head = head_of(b"\nPUT / HTTP/1.0\nX-Long: a\n  b\n\n").await.unwrap().unwrap();
        assert_eq!(head.method, Method::PUT);
        assert_eq!(head.header("x-long"), Some("a b"));
    }

    #[tokio::test]
    async fn closed_before_request_is_none() {
        assert!(head_of(b"").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_garbage() {
        assert!(matches!(
            head_of(b"HELLO\r\n\r\n").await,
            Err(UploadError::Protocol(ProtocolError::MalformedRequestLine))
        ));
        assert!(matches!(
            head_of(b"POST / HTTP/1.1\r\nno colon here\r\n\r\n").await,
            Err(UploadError::Protocol(ProtocolError::MalformedHeader))
        ));
    }

    #[tokio::test]
    async fn oversized_head_is_rejected() {
        let mut raw = b"POST / HTTP/1.1\r\nX-Pad: ".to_vec();
        raw.extend(std::iter::repeat(b'a').take(2048));
        raw.extend_from_slice(b"\r\n\r\n");
        assert!(matches!(
            head_of(&raw).await,
            Err(UploadError::Protocol(ProtocolError::HeadersTooLarge { limit: 1024 }))
        ));
    }

    #[tokio::test]
    async fn reads_content_length_body() {
        let raw: &[u8] = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello trailing";
        let mut reader = BufReader::new(raw);
        let head = read_head(&mut reader, 1024).await.unwrap().unwrap();
        assert_eq!(read_body(&mut reader, &head, 100).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn reads_until_eof_without_length() {
        let raw: &[u8] = b"POST / HTTP/1.0\r\n\r\n<Report/>";
        let mut reader = BufReader::new(raw);
        let head = read_head(&mut reader, 1024).await.unwrap().unwrap();
        assert_eq!(read_body(&mut reader, &head, 100).await.unwrap(), b"<Report/>");
    }

    #[tokio::test]
    async fn eof_body_respects_limit() {
        let raw: &[u8] = b"POST / HTTP/1.0\r\n\r\n0123456789";
        let mut reader = BufReader::new(raw);
        let head = read_head(&mut reader, 1024).await.unwrap().unwrap();
        assert!(matches!(
            read_body(&mut reader, &head, 4).await,
            Err(UploadError::Protocol(ProtocolError::BodyTooLarge { limit: 4 }))
        ));
    }

    #[tokio::test]
    async fn short_body_is_transport_failure() {
        let raw: &[u8] = b"POST / HTTP/1.1\r\nContent-Length: 50\r\n\r\nshort";
        let mut reader = BufReader::new(raw);
        let head = read_head(&mut reader, 1024).await.unwrap().unwrap();
        assert!(matches!(
            read_body(&mut reader, &head, 100).await,
            Err(UploadError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn decodes_chunked_body() {
        let raw: &[u8] =
            b"PUT / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n4\r\n<Rep\r\n6;ext=1\r\nort/>\n\r\n0\r\nX-Trailer: 1\r\n\r\n";
        let mut reader = BufReader::new(raw);
        let head = read_head(&mut reader, 1024).await.unwrap().unwrap();
        assert!(head.is_chunked());
        assert_eq!(read_body(&mut reader, &head, 100).await.unwrap(), b"<Report/>\n");
    }

    #[test]
    fn conflicting_lengths_are_invalid() {
        let head = RequestHead {
            method: Method::POST,
            target: "/".into(),
            version: "HTTP/1.1".into(),
            headers: vec![
                ("Content-Length".into(), "3".into()),
                ("content-length".into(), "4".into()),
            ],
        };
        assert!(matches!(head.content_length(), Err(ProtocolError::InvalidContentLength)));
    }

    #[tokio::test]
    async fn continue_only_for_http11_clients() {
        let head = head_of(b"POST / HTTP/1.1\r\nExpect: 100-continue\r\n\r\n").await.unwrap().unwrap();
        assert!(head.expects_continue());

        let head = head_of(b"POST / HTTP/1.0\r\nExpect: 100-Continue\r\n\r\n").await.unwrap().unwrap();
        assert_eq!(head.version, "HTTP/1.0");
        assert!(!head.expects_continue());
    }

    #[test]
    fn request_id_short_form() {
        let id = RequestId::new();
        assert_eq!(id.short().len(), 8);
        assert!(id.to_string().starts_with(&id.short()));
    }
}
