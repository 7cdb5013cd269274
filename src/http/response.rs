//! Response builder: writes a status line, headers, and body directly
//! into an owned byte buffer.
//!
//! Grounded on the teacher's `http/response.rs` fluent `Vec<u8>`-buffer
//! builder with a `ResponseState` ordering guard; kept here as a
//! free-standing struct (rather than the teacher's connection-coupled
//! lifetime) since CGI and uploads assemble responses outside the
//! connection's own read/write cycle.

use crate::date::http_date_now;
use crate::http::types::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseState {
    Clean,
    Headers,
    Complete,
}

pub struct ResponseBuilder {
    buffer: Vec<u8>,
    state: ResponseState,
    chunked: bool,
}

impl ResponseBuilder {
    /// The start line is always `HTTP/1.1`, regardless of the request's
    /// version, matching the original's fixed response-line format.
    pub fn new(status: StatusCode) -> Self {
        let mut buffer = Vec::with_capacity(256);
        buffer.extend_from_slice(status.first_line().as_bytes());
        let mut b = Self {
            buffer,
            state: ResponseState::Clean,
            chunked: false,
        };
        b.header("Server", "webserv-dev");
        b.header("Date", &http_date_now());
        b
    }

    pub fn header(&mut self, name: &str, value: &str) -> &mut Self {
        debug_assert!(self.state != ResponseState::Complete, "header after completion");
        self.buffer.extend_from_slice(name.as_bytes());
        self.buffer.extend_from_slice(b": ");
        self.buffer.extend_from_slice(value.as_bytes());
        self.buffer.extend_from_slice(b"\r\n");
        self.state = ResponseState::Headers;
        self
    }

    pub fn connection(&mut self, keep_alive: bool) -> &mut Self {
        if keep_alive {
            self.header("Connection", "keep-alive");
            self.header("Keep-Alive", "timeout=5, max=100");
        } else {
            self.header("Connection", "close");
        }
        self
    }

    /// Finishes headers with a known `Content-Length` and appends `body`.
    pub fn body(&mut self, content_type: &str, body: &[u8]) -> Vec<u8> {
        debug_assert!(!self.chunked, "body() called after chunked() framing was chosen");
        self.header("Content-Type", content_type);
        self.header("Content-Length", &body.len().to_string());
        self.buffer.extend_from_slice(b"\r\n");
        self.buffer.extend_from_slice(body);
        self.state = ResponseState::Complete;
        std::mem::take(&mut self.buffer)
    }

    /// Finishes headers with no body at all (e.g. 204, or a `HEAD` reply).
    pub fn no_body(&mut self, content_type: &str, content_length: usize) -> Vec<u8> {
        self.header("Content-Type", content_type);
        self.header("Content-Length", &content_length.to_string());
        self.buffer.extend_from_slice(b"\r\n");
        self.state = ResponseState::Complete;
        std::mem::take(&mut self.buffer)
    }

    /// Finishes headers for a chunked body and appends one final chunk
    /// containing all of `body` (used when a source, e.g. CGI, didn't
    /// supply a `Content-Length`).
    pub fn chunked_body(&mut self, content_type: &str, body: &[u8]) -> Vec<u8> {
        self.chunked = true;
        self.header("Content-Type", content_type);
        self.header("Transfer-Encoding", "chunked");
        self.buffer.extend_from_slice(b"\r\n");
        if !body.is_empty() {
            self.buffer.extend_from_slice(format!("{:x}\r\n", body.len()).as_bytes());
            self.buffer.extend_from_slice(body);
            self.buffer.extend_from_slice(b"\r\n");
        }
        self.buffer.extend_from_slice(b"0\r\n\r\n");
        self.state = ResponseState::Complete;
        std::mem::take(&mut self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_simple_ok_response() {
        let mut b = ResponseBuilder::new(StatusCode::Ok);
        b.connection(true);
        let out = b.body("text/plain; charset=utf-8", b"hi");
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 2\r\n"));
        assert!(text.contains("Connection: keep-alive\r\n"));
        assert!(text.ends_with("\r\n\r\nhi"));
    }

    #[test]
    fn chunked_body_wraps_in_one_chunk_plus_terminator() {
        let mut b = ResponseBuilder::new(StatusCode::Ok);
        let out = b.chunked_body("text/plain; charset=utf-8", b"ok");
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Transfer-Encoding: chunked\r\n"));
        assert!(text.ends_with("2\r\nok\r\n0\r\n\r\n"));
        assert!(!text.contains("Content-Length"));
    }

    #[test]
    fn head_response_has_no_body_bytes() {
        let mut b = ResponseBuilder::new(StatusCode::Ok);
        let out = b.no_body("text/html; charset=utf-8", 42);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Content-Length: 42\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }
}
