use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, ErrorKind, Read};

use serde::de::DeserializeOwned;


const MODULE: &str = "REQUEST";

/// Cap on a single request/header line, to bound memory on malicious input.
pub const MAX_LINE_LENGTH: usize = 8192;


#[derive(Debug)]
pub enum ParseError {
    /// The request line was missing or did not split into exactly
    /// method, request-target and version.
    MalformedRequestLine,
    /// A single line exceeded [`MAX_LINE_LENGTH`].
    LineTooLong,
    /// The underlying stream failed.
    Io(std::io::Error),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MalformedRequestLine => write!(f, "malformed request line"),
            ParseError::LineTooLong => write!(f, "request or header line too long"),
            ParseError::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl std::error::Error for ParseError {}


/// One parsed HTTP/1.x request. Immutable once constructed; owned by the
/// connection that read it.
#[derive(Debug)]
pub struct Request {
    pub http_version: String,
    pub method: String,
    /// Request path with the query string already stripped.
    pub path: String,
    pub query_params: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    /// `None` when the request carried no `Content-Length` header.
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|v| v.as_str())
    }

    pub fn body_str(&self) -> Option<&str> {
        self.body.as_deref().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Best-effort JSON decode of the body. Returns `None` when the body is
    /// absent or does not decode; the caller must check, nothing escapes.
    pub fn body_as<T: DeserializeOwned>(&self) -> Option<T> {
        let body = self.body.as_deref()?;
        match serde_json::from_slice(body) {
            Ok(v) => Some(v),
            Err(e) => {
                error!("[{}] Failed to decode request body as JSON: {}", MODULE, e);
                None
            }
        }
    }
}


/// Parse one request from a live connection stream.
///
/// The reader is consumed with exact accounting: nothing past the end of the
/// declared body is touched. If the stream ends before `Content-Length`
/// bytes arrive, the truncated body is returned as-is rather than failing;
/// misbehaving clients get best-effort treatment, not an error.
pub fn parse<R: BufRead>(stream: &mut R) -> Result<Request, ParseError> {
    // Request line, skipping any leading blank lines for robustness.
    let request_line = loop {
        match read_line(stream)? {
            None => return Err(ParseError::MalformedRequestLine),
            Some(l) if l.is_empty() => continue,
            Some(l) => break l,
        }
    };
    debug!("[{}] Request-Line: {}", MODULE, request_line);

    let mut parts = request_line.split_whitespace();
    let (method, target, http_version) =
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(m), Some(t), Some(v), None) => (m.to_string(), t, v.to_string()),
            _ => {
                warn!("[{}] Invalid request line: {}", MODULE, request_line);
                return Err(ParseError::MalformedRequestLine);
            }
        };

    let (path, query_params) = split_target(target);

    // Headers until the first blank line. Lines without a `": "` separator
    // are dropped silently; duplicate names keep the last value.
    let mut headers: HashMap<String, String> = HashMap::new();
    loop {
        match read_line(stream)? {
            None => break,
            Some(l) if l.is_empty() => break,
            Some(l) => {
                if let Some((name, value)) = l.split_once(": ") {
                    headers.insert(name.to_string(), value.to_string());
                }
            }
        }
    }

    // Body only when Content-Length says so; an unparseable length reads as 0.
    let body = match headers.get("Content-Length") {
        Some(v) => {
            let length = v.trim().parse::<usize>().unwrap_or(0);
            Some(read_fixed_length(stream, length).map_err(ParseError::Io)?)
        }
        None => None,
    };

    Ok(Request { http_version, method, path, query_params, headers, body })
}

/// Split the request-target on the first `?`. Query pairs without an `=`
/// are discarded; repeated keys keep the last value.
fn split_target(target: &str) -> (String, HashMap<String, String>) {
    match target.split_once('?') {
        None => (target.to_string(), HashMap::new()),
        Some((path, query)) => {
            let mut params = HashMap::new();
            for pair in query.split('&') {
                if let Some((k, v)) = pair.split_once('=') {
                    params.insert(k.to_string(), v.to_string());
                }
            }
            (path.to_string(), params)
        }
    }
}

/// Read one line terminated by CRLF or bare LF, without the terminator.
/// Returns `None` at end-of-stream with no bytes read.
fn read_line<R: BufRead>(stream: &mut R) -> Result<Option<String>, ParseError> {
    let mut line: Vec<u8> = Vec::new();
    let mut eof = false;
    loop {
        let (consumed, found) = {
            let available = match stream.fill_buf() {
                Ok(b) => b,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ParseError::Io(e)),
            };
            if available.is_empty() {
                eof = true;
                (0, false)
            } else if let Some(pos) = available.iter().position(|&b| b == b'\n') {
                line.extend_from_slice(&available[..pos]);
                (pos + 1, true)
            } else {
                line.extend_from_slice(available);
                (available.len(), false)
            }
        };
        stream.consume(consumed);
        if line.len() > MAX_LINE_LENGTH {
            return Err(ParseError::LineTooLong);
        }
        if found || eof {
            break;
        }
    }
    if eof && line.is_empty() {
        return Ok(None);
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

/// Read exactly `length` bytes, looping over short reads. A premature
/// end-of-stream returns whatever arrived.
fn read_fixed_length<R: Read>(stream: &mut R, length: usize) -> std::io::Result<Vec<u8>> {
    let mut data = vec![0u8; length];
    let mut offset = 0;
    while offset < length {
        match stream.read(&mut data[offset..]) {
            Ok(0) => break,
            Ok(n) => offset += n,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    data.truncate(offset);
    Ok(data)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse_str(raw: &str) -> Result<Request, ParseError> {
        parse(&mut Cursor::new(raw.as_bytes().to_vec()))
    }

    #[test]
    fn parses_simple_get() {
        let r = parse_str("GET /books HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
        assert_eq!(r.method, "GET");
        assert_eq!(r.path, "/books");
        assert_eq!(r.http_version, "HTTP/1.1");
        assert_eq!(r.header("Host"), Some("localhost"));
        assert!(r.body.is_none());
    }

    #[test]
    fn strips_query_string_from_path() {
        let r = parse_str("GET /books?id=7&sort=asc HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(r.path, "/books");
        assert_eq!(r.query_param("id"), Some("7"));
        assert_eq!(r.query_param("sort"), Some("asc"));
        assert_eq!(r.query_params.len(), 2);
    }

    #[test]
    fn query_last_value_wins_and_bare_keys_dropped() {
        let r = parse_str("GET /x?a=1&a=2&flag&b=3 HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(r.query_param("a"), Some("2"));
        assert_eq!(r.query_param("b"), Some("3"));
        assert!(r.query_param("flag").is_none());
    }

    #[test]
    fn skips_leading_blank_lines() {
        let r = parse_str("\r\n\r\nGET / HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(r.path, "/");
    }

    #[test]
    fn tolerates_bare_lf_terminators() {
        let r = parse_str("GET /a HTTP/1.1\nHost: x\n\n").unwrap();
        assert_eq!(r.path, "/a");
        assert_eq!(r.header("Host"), Some("x"));
    }

    #[test]
    fn reads_body_of_declared_length() {
        let r = parse_str("POST /books HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello").unwrap();
        assert_eq!(r.body.as_deref(), Some(b"hello".as_slice()));
    }

    #[test]
    fn truncates_body_on_premature_eof() {
        let r = parse_str("POST /x HTTP/1.1\r\nContent-Length: 100\r\n\r\nshort").unwrap();
        assert_eq!(r.body.as_deref(), Some(b"short".as_slice()));
    }

    #[test]
    fn missing_content_length_means_absent_body() {
        let r = parse_str("POST /x HTTP/1.1\r\n\r\nignored").unwrap();
        assert!(r.body.is_none());
    }

    #[test]
    fn unparseable_content_length_reads_empty_body() {
        let r = parse_str("POST /x HTTP/1.1\r\nContent-Length: nope\r\n\r\n").unwrap();
        assert_eq!(r.body.as_deref(), Some(b"".as_slice()));
    }

    #[test]
    fn drops_headers_without_separator_and_keeps_last_duplicate() {
        let r = parse_str("GET / HTTP/1.1\r\nbroken-line\r\nX-A: 1\r\nX-A: 2\r\n\r\n").unwrap();
        assert_eq!(r.header("X-A"), Some("2"));
        assert!(r.header("broken-line").is_none());
    }

    #[test]
    fn rejects_malformed_request_line() {
        assert!(matches!(parse_str("BADLINE\r\n\r\n"), Err(ParseError::MalformedRequestLine)));
        assert!(matches!(parse_str("GET / HTTP/1.1 extra\r\n\r\n"), Err(ParseError::MalformedRequestLine)));
        assert!(matches!(parse_str(""), Err(ParseError::MalformedRequestLine)));
    }

    #[test]
    fn rejects_oversized_line() {
        let raw = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(MAX_LINE_LENGTH + 1));
        assert!(matches!(parse_str(&raw), Err(ParseError::LineTooLong)));
    }

    #[test]
    fn body_as_decodes_json_or_returns_none() {
        let r = parse_str("POST /x HTTP/1.1\r\nContent-Length: 16\r\n\r\n{\"title\":\"Dune\"}").unwrap();
        let v: Option<serde_json::Value> = r.body_as();
        assert_eq!(v.unwrap()["title"], "Dune");

        let bad = parse_str("POST /x HTTP/1.1\r\nContent-Length: 3\r\n\r\n{{{").unwrap();
        let none: Option<serde_json::Value> = bad.body_as();
        assert!(none.is_none());
    }
}
