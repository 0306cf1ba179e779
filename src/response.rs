use std::collections::HashMap;

use serde::Serialize;


const MODULE: &str = "RESPONSE";

pub const HTTP_200: u16 = 200;
pub const HTTP_201: u16 = 201;
pub const HTTP_400: u16 = 400;
pub const HTTP_404: u16 = 404;
pub const HTTP_500: u16 = 500;


/// An HTTP response under construction. Handlers mutate it through the
/// builder methods; the server normalizes `Content-Length` to the final
/// body right before formatting, whatever a handler may have set.
#[derive(Debug)]
pub struct Response {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub http_version: String,
}

impl Response {
    pub fn new(status_code: u16) -> Response {
        let mut headers = HashMap::new();
        headers.insert("Content-Length".to_string(), "0".to_string());
        headers.insert("Connection".to_string(), "close".to_string());
        headers.insert("Content-Type".to_string(), "text/plain".to_string());
        Response {
            status_code,
            headers,
            body: Vec::new(),
            http_version: "HTTP/1.1".to_string(),
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Response {
        self.status_code = status_code;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Response {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_content_type(self, content_type: &str) -> Response {
        self.with_header("Content-Type", content_type)
    }

    pub fn with_body(self, body: &str) -> Response {
        self.with_body_bytes(body.as_bytes().to_vec())
    }

    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Response {
        let length = body.len();
        self.body = body;
        self.with_header("Content-Length", &length.to_string())
    }

    /// Serialize a value to JSON body bytes and set the content type.
    /// Serialization failure degrades to a 500 with an empty body rather
    /// than escaping into the dispatcher.
    pub fn with_json<T: Serialize>(self, value: &T) -> Response {
        match serde_json::to_vec(value) {
            Ok(bytes) => self
                .with_content_type("application/json")
                .with_body_bytes(bytes),
            Err(e) => {
                error!("[{}] Failed to serialize response body: {}", MODULE, e);
                self.with_status(HTTP_500).with_body_bytes(Vec::new())
            }
        }
    }

    /// Force `Content-Length` to the exact byte length of the current body.
    pub fn normalize_content_length(&mut self) {
        self.headers
            .insert("Content-Length".to_string(), self.body.len().to_string());
    }

    /// Status line and headers, terminated by the blank line. The body is
    /// written separately, verbatim, so binary payloads are never
    /// re-encoded.
    pub fn format_head(&self) -> Vec<u8> {
        let mut head = format!(
            "{} {} {}\r\n",
            self.http_version,
            self.status_code,
            reason_phrase(self.status_code)
        );
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");
        head.into_bytes()
    }
}

pub fn reason_phrase(status_code: u16) -> &'static str {
    match status_code {
        // 2xx Success
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",

        // 3xx Redirection
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",

        // 4xx Client Error
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",

        // 5xx Server Error
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown Status",
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_headers_are_present() {
        let r = Response::new(HTTP_200);
        assert_eq!(r.headers.get("Connection").unwrap(), "close");
        assert_eq!(r.headers.get("Content-Type").unwrap(), "text/plain");
        assert_eq!(r.headers.get("Content-Length").unwrap(), "0");
    }

    #[test]
    fn with_body_updates_content_length() {
        let r = Response::new(HTTP_200).with_body("hello");
        assert_eq!(r.headers.get("Content-Length").unwrap(), "5");
        assert_eq!(r.body, b"hello");
    }

    #[test]
    fn normalize_overrides_handler_set_length() {
        let mut r = Response::new(HTTP_200)
            .with_body("hello")
            .with_header("Content-Length", "999");
        r.normalize_content_length();
        assert_eq!(r.headers.get("Content-Length").unwrap(), "5");
    }

    #[test]
    fn with_json_sets_body_and_content_type() {
        let r = Response::new(HTTP_200).with_json(&vec!["a", "b"]);
        assert_eq!(r.headers.get("Content-Type").unwrap(), "application/json");
        assert_eq!(r.body, br#"["a","b"]"#);
        assert_eq!(r.headers.get("Content-Length").unwrap(), "9");
    }

    #[test]
    fn reason_phrases_match_table() {
        assert_eq!(reason_phrase(200), "OK");
        assert_eq!(reason_phrase(201), "Created");
        assert_eq!(reason_phrase(404), "Not Found");
        assert_eq!(reason_phrase(500), "Internal Server Error");
        assert_eq!(reason_phrase(504), "Gateway Timeout");
        assert_eq!(reason_phrase(799), "Unknown Status");
    }

    // Formatting then re-reading the head yields the same status and headers.
    #[test]
    fn format_head_round_trips() {
        let r = Response::new(HTTP_201).with_body("x").with_header("X-Extra", "v");
        let head = String::from_utf8(r.format_head()).unwrap();

        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap();
        assert_eq!(status_line, "HTTP/1.1 201 Created");

        let mut parsed = HashMap::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = line.split_once(": ").unwrap();
            parsed.insert(name.to_string(), value.to_string());
        }
        assert_eq!(parsed, r.headers);
        assert!(head.ends_with("\r\n\r\n"));
    }
}
