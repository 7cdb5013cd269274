//! Incremental HTTP/1.1 request parser.
//!
//! Grounded on the teacher's manual state-machine/`memchr`-based parsing
//! style (`http/request.rs` in the original crate), generalized from
//! `'static`-lifetime borrowed slices to owned buffers: CGI, uploads,
//! and the router all need to hold request data past the lifetime of
//! the socket read that produced it.

use crate::http::chunked::{ChunkedDecoder, Step as ChunkedStep};
use crate::http::types::{HeaderMap, Method, Version};

pub const MAX_REQUEST_LINE: usize = 8 * 1024;
pub const MAX_HEADER_BLOCK: usize = 64 * 1024;
pub const DEFAULT_MAX_BODY: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ReqLine,
    Headers,
    BodyIdentity,
    BodyChunked,
    Done,
}

#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub version: Version,
    pub raw_target: String,
    pub target: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParseOutcome {
    NeedMore,
    BadRequest,
    NotImplemented,
    LengthRequired,
    EntityTooLarge,
}

pub struct RequestParser {
    state: State,
    method: Method,
    version: Version,
    raw_target: String,
    headers: HeaderMap,
    body: Vec<u8>,
    content_length: Option<usize>,
    chunked: Option<ChunkedDecoder>,
    max_body: usize,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BODY)
    }
}

impl RequestParser {
    pub fn new(max_body: usize) -> Self {
        Self {
            state: State::ReqLine,
            method: Method::Other,
            version: Version::Http11,
            raw_target: String::new(),
            headers: HeaderMap::new(),
            body: Vec::new(),
            content_length: None,
            chunked: None,
            max_body,
        }
    }

    /// Resets all parsed state for keep-alive reuse; does not touch any
    /// caller-held leftover bytes (those live in the connection's own
    /// input buffer and get re-fed on the next call to [`Self::parse`]).
    pub fn reset(&mut self) {
        *self = Self::new(self.max_body);
    }

    /// Attempts to parse a complete request out of `buf`. Returns the
    /// number of bytes consumed from `buf` and the outcome. The caller
    /// should drop the consumed prefix (even on `NeedMore`, where it
    /// reflects request-line/header/body-so-far bytes already folded
    /// into parser state) and re-invoke with the remainder appended to
    /// freshly read bytes.
    pub fn parse(&mut self, buf: &[u8]) -> (usize, Result<Option<Request>, ParseOutcome>) {
        let mut pos = 0;

        if self.state == State::ReqLine {
            let Some(nl) = memchr::memchr(b'\n', buf) else {
                if buf.len() > MAX_REQUEST_LINE {
                    return (0, Err(ParseOutcome::BadRequest));
                }
                return (0, Err(ParseOutcome::NeedMore));
            };
            if nl > MAX_REQUEST_LINE {
                return (0, Err(ParseOutcome::BadRequest));
            }
            let mut line = &buf[..nl];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            let Some((method, target, version)) = parse_request_line(line) else {
                return (0, Err(ParseOutcome::BadRequest));
            };
            self.method = method;
            self.version = version;
            self.raw_target = target;
            pos = nl + 1;
            self.state = State::Headers;
        }

        if self.state == State::Headers {
            let Some(header_end) = find_header_block_end(&buf[pos..]) else {
                if buf[pos..].len() > MAX_HEADER_BLOCK {
                    return (pos, Err(ParseOutcome::BadRequest));
                }
                return (pos, Err(ParseOutcome::NeedMore));
            };
            if header_end > MAX_HEADER_BLOCK {
                return (pos, Err(ParseOutcome::BadRequest));
            }
            let block = &buf[pos..pos + header_end];
            if !parse_headers_into(block, &mut self.headers) {
                return (pos, Err(ParseOutcome::BadRequest));
            }
            pos += header_end;

            match self.decide_body_framing() {
                Ok(()) => {}
                Err(e) => return (pos, Err(e)),
            }
        }

        match self.state {
            State::BodyIdentity => {
                let need = self.content_length.unwrap_or(0);
                let avail = buf.len() - pos;
                let take = avail.min(need - self.body.len());
                self.body.extend_from_slice(&buf[pos..pos + take]);
                pos += take;
                if self.body.len() >= need {
                    self.state = State::Done;
                } else {
                    return (pos, Err(ParseOutcome::NeedMore));
                }
            }
            State::BodyChunked => {
                let decoder = self.chunked.get_or_insert_with(ChunkedDecoder::new);
                let (consumed, step) = decoder.feed(&buf[pos..], &mut self.body);
                pos += consumed;
                match step {
                    ChunkedStep::NeedMore => return (pos, Err(ParseOutcome::NeedMore)),
                    ChunkedStep::Invalid => return (pos, Err(ParseOutcome::BadRequest)),
                    ChunkedStep::Done => {
                        if self.body.len() > self.max_body {
                            return (pos, Err(ParseOutcome::EntityTooLarge));
                        }
                        self.state = State::Done;
                    }
                }
            }
            State::Done => {}
            State::ReqLine | State::Headers => unreachable!(),
        }

        let req = Request {
            method: self.method,
            version: self.version,
            raw_target: self.raw_target.clone(),
            target: self.raw_target.clone(),
            headers: self.headers.clone(),
            body: std::mem::take(&mut self.body),
        };
        (pos, Ok(Some(req)))
    }

    fn decide_body_framing(&mut self) -> Result<(), ParseOutcome> {
        if let Some(te) = self.headers.get("transfer-encoding") {
            if te.eq_ignore_ascii_case("chunked") {
                self.state = State::BodyChunked;
                return Ok(());
            }
            return Err(ParseOutcome::NotImplemented);
        }

        if let Some(cl) = self.headers.get("content-length") {
            let Ok(len) = cl.trim().parse::<usize>() else {
                return Err(ParseOutcome::BadRequest);
            };
            if len > self.max_body {
                return Err(ParseOutcome::EntityTooLarge);
            }
            self.content_length = Some(len);
            self.state = if len == 0 { State::Done } else { State::BodyIdentity };
            return Ok(());
        }

        if matches!(self.method, Method::Post) {
            return Err(ParseOutcome::LengthRequired);
        }

        self.state = State::Done;
        Ok(())
    }
}

fn parse_request_line(line: &[u8]) -> Option<(Method, String, Version)> {
    let (method, consumed) = Method::from_bytes(line);
    if matches!(method, Method::Other) {
        return None;
    }
    let rest = &line[consumed + 1..];
    let sp = memchr::memchr(b' ', rest)?;
    let target = std::str::from_utf8(&rest[..sp]).ok()?.to_string();
    let version_bytes = &rest[sp + 1..];
    let (version, _) = Version::from_bytes(version_bytes)?;
    Some((method, target, version))
}

/// Returns the byte offset just past the terminating blank line of the
/// header block (i.e. past `CRLF CRLF`), or `None` if not yet present.
fn find_header_block_end(buf: &[u8]) -> Option<usize> {
    memchr::memmem::find(buf, b"\r\n\r\n").map(|i| i + 4)
}

fn parse_headers_into(block: &[u8], headers: &mut HeaderMap) -> bool {
    // `block` includes the trailing CRLFCRLF; strip it before splitting lines.
    let body = &block[..block.len() - 4];
    if body.is_empty() {
        return true;
    }
    for line in body.split(|&b| b == b'\n') {
        let line = if line.last() == Some(&b'\r') {
            &line[..line.len() - 1]
        } else {
            line
        };
        if line.is_empty() {
            continue;
        }
        let Some(colon) = memchr::memchr(b':', line) else {
            return false;
        };
        let Ok(name) = std::str::from_utf8(&line[..colon]) else {
            return false;
        };
        let Ok(value) = std::str::from_utf8(&line[colon + 1..]) else {
            return false;
        };
        headers.push(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_get() {
        let mut p = RequestParser::default();
        let buf = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let (consumed, result) = p.parse(buf);
        assert_eq!(consumed, buf.len());
        let req = result.unwrap().unwrap();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.raw_target, "/index.html");
        assert_eq!(req.headers.get("host"), Some("example.com"));
        assert!(req.body.is_empty());
    }

    #[test]
    fn needs_more_on_partial_request_line() {
        let mut p = RequestParser::default();
        let (_consumed, result) = p.parse(b"GET /x HTTP/1.1\r\n");
        assert_eq!(result.unwrap_err(), ParseOutcome::NeedMore);
    }

    #[test]
    fn post_without_framing_requires_length() {
        let mut p = RequestParser::default();
        let buf = b"POST /submit HTTP/1.1\r\nHost: h\r\n\r\n";
        let (_consumed, result) = p.parse(buf);
        assert_eq!(result.unwrap_err(), ParseOutcome::LengthRequired);
    }

    #[test]
    fn parses_identity_body_by_content_length() {
        let mut p = RequestParser::default();
        let buf = b"POST /x HTTP/1.1\r\nHost: h\r\nContent-Length: 5\r\n\r\nhello";
        let (consumed, result) = p.parse(buf);
        assert_eq!(consumed, buf.len());
        let req = result.unwrap().unwrap();
        assert_eq!(req.body, b"hello");
    }

    #[test]
    fn rejects_oversized_content_length() {
        let mut p = RequestParser::new(4);
        let buf = b"POST /x HTTP/1.1\r\nHost: h\r\nContent-Length: 5\r\n\r\nhello";
        let (_consumed, result) = p.parse(buf);
        assert_eq!(result.unwrap_err(), ParseOutcome::EntityTooLarge);
    }

    #[test]
    fn unsupported_transfer_encoding_is_not_implemented() {
        let mut p = RequestParser::default();
        let buf = b"POST /x HTTP/1.1\r\nHost: h\r\nTransfer-Encoding: gzip\r\n\r\n";
        let (_consumed, result) = p.parse(buf);
        assert_eq!(result.unwrap_err(), ParseOutcome::NotImplemented);
    }

    #[test]
    fn parses_chunked_body() {
        let mut p = RequestParser::default();
        let buf = b"POST /x HTTP/1.1\r\nHost: h\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n";
        let (consumed, result) = p.parse(buf);
        assert_eq!(consumed, buf.len());
        let req = result.unwrap().unwrap();
        assert_eq!(req.body, b"hello");
    }

    #[test]
    fn reset_allows_reuse_for_keep_alive() {
        let mut p = RequestParser::default();
        let buf = b"GET / HTTP/1.1\r\nHost: h\r\n\r\n";
        let _ = p.parse(buf);
        p.reset();
        let (consumed, result) = p.parse(buf);
        assert_eq!(consumed, buf.len());
        assert!(result.unwrap().is_some());
    }
}
