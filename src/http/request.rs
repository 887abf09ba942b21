//! HTTP request parsing
//!
//! Hand-written HTTP/1.1 parsing over a buffered stream: request line,
//! headers, and a Content-Length body capped by configuration. Percent
//! encoding is decoded for the path and for query values.

use std::collections::HashMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::HttpError;

const MAX_LINE_LENGTH: usize = 8192;
const MAX_HEADERS: usize = 100;

/// A parsed HTTP request.
#[derive(Debug)]
pub struct Request {
    pub method: String,
    /// Decoded path without the query string.
    pub path: String,
    pub query: HashMap<String, String>,
    /// Header names lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// Read and parse one request from the stream.
pub async fn read_request<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_body: usize,
) -> Result<Request, HttpError> {
    let request_line = read_line(reader).await?;
    let mut parts = request_line.split_whitespace();

    let method = parts
        .next()
        .ok_or_else(|| HttpError::MalformedRequest("empty request line".into()))?
        .to_string();
    let target = parts
        .next()
        .ok_or_else(|| HttpError::MalformedRequest("missing request target".into()))?;
    let version = parts
        .next()
        .ok_or_else(|| HttpError::MalformedRequest("missing HTTP version".into()))?;

    if version != "HTTP/1.1" && version != "HTTP/1.0" {
        return Err(HttpError::MalformedRequest(format!(
            "unsupported version {}",
            version
        )));
    }

    let (raw_path, raw_query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };

    let path = percent_decode(raw_path, false)?;
    let query = match raw_query {
        Some(raw) => parse_query(raw)?,
        None => HashMap::new(),
    };

    let mut headers = HashMap::new();
    loop {
        let line = read_line(reader).await?;
        if line.is_empty() {
            break;
        }
        if headers.len() >= MAX_HEADERS {
            return Err(HttpError::MalformedRequest("too many headers".into()));
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| HttpError::MalformedRequest("header without colon".into()))?;
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    let body = match headers.get("content-length") {
        Some(raw_length) => {
            let length: usize = raw_length
                .parse()
                .map_err(|_| HttpError::MalformedRequest("bad content-length".into()))?;
            if length > max_body {
                return Err(HttpError::BodyTooLarge(length));
            }
            let mut body = vec![0u8; length];
            reader.read_exact(&mut body).await?;
            body
        }
        None => Vec::new(),
    };

    Ok(Request {
        method,
        path,
        query,
        headers,
        body,
    })
}

/// Read one CRLF-terminated line, without the terminator.
async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String, HttpError> {
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(HttpError::MalformedRequest("connection closed".into()));
    }
    if line.len() > MAX_LINE_LENGTH {
        return Err(HttpError::MalformedRequest("line too long".into()));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn parse_query(raw: &str) -> Result<HashMap<String, String>, HttpError> {
    let mut query = HashMap::new();
    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        query.insert(percent_decode(name, true)?, percent_decode(value, true)?);
    }
    Ok(query)
}

/// Decode percent escapes; in query context `+` also decodes to a space.
fn percent_decode(raw: &str, plus_as_space: bool) -> Result<String, HttpError> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .and_then(|pair| std::str::from_utf8(pair).ok())
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                    .ok_or_else(|| {
                        HttpError::MalformedRequest("invalid percent escape".into())
                    })?;
                out.push(hex);
                i += 3;
            }
            b'+' if plus_as_space => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| HttpError::MalformedRequest("invalid UTF-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn parse(raw: &[u8]) -> Result<Request, HttpError> {
        let mut reader = BufReader::new(raw);
        read_request(&mut reader, 1024).await
    }

    #[tokio::test]
    async fn test_parse_get_with_query() {
        let request = parse(b"GET /api/files?path=docs%2Freports HTTP/1.1\r\nHost: x\r\n\r\n")
            .await
            .unwrap();

        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/api/files");
        assert_eq!(request.query_param("path"), Some("docs/reports"));
        assert_eq!(request.header("host"), Some("x"));
        assert!(request.body.is_empty());
    }

    #[tokio::test]
    async fn test_parse_post_with_body() {
        let request = parse(
            b"POST /api/refresh HTTP/1.1\r\nContent-Length: 4\r\n\r\nabcd",
        )
        .await
        .unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.body, b"abcd");
    }

    #[tokio::test]
    async fn test_header_names_case_insensitive() {
        let request = parse(b"GET / HTTP/1.1\r\nCoNtEnT-TyPe: text/plain\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(request.content_type(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_plus_decodes_in_query_only() {
        let request = parse(b"GET /a+b?name=x+y HTTP/1.1\r\n\r\n").await.unwrap();
        assert_eq!(request.path, "/a+b");
        assert_eq!(request.query_param("name"), Some("x y"));
    }

    #[tokio::test]
    async fn test_body_over_limit_rejected() {
        let result = parse(b"POST /api/upload HTTP/1.1\r\nContent-Length: 2048\r\n\r\n").await;
        assert!(matches!(result, Err(HttpError::BodyTooLarge(2048))));
    }

    #[tokio::test]
    async fn test_malformed_request_line() {
        let result = parse(b"GARBAGE\r\n\r\n").await;
        assert!(matches!(result, Err(HttpError::MalformedRequest(_))));
    }

    #[tokio::test]
    async fn test_bad_percent_escape() {
        let result = parse(b"GET /%zz HTTP/1.1\r\n\r\n").await;
        assert!(matches!(result, Err(HttpError::MalformedRequest(_))));
    }

    #[tokio::test]
    async fn test_encoded_traversal_reaches_handlers_decoded() {
        // The parser only decodes; containment is the path guard's job.
        let request = parse(b"GET /api/files?path=..%2F..%2Fetc HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(request.query_param("path"), Some("../../etc"));
    }
}
