//! HTTP-facing error kinds and their canned responses.
//!
//! Grounded on the teacher's `errors.rs`: an `ErrorKind` enum plus a
//! declarative macro generating the status/reason/body for each kind.
//! Config-file errors are not part of this enum (see
//! [`crate::config::ConfigError`]) since those occur before any
//! connection exists and are reported on stderr, not over HTTP.

use crate::http::types::StatusCode;
use crate::http::ParseOutcome;

macro_rules! http_errors {
    ($($variant:ident => $status:expr;)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum ErrorKind {
            $($variant,)*
        }

        impl ErrorKind {
            pub fn status(&self) -> StatusCode {
                match self {
                    $(ErrorKind::$variant => $status,)*
                }
            }

            /// `<code> <reason>\n`, the plain-text fallback body used
            /// when no `error_page` is configured for this status.
            pub fn default_body(&self) -> String {
                format!("{} {}\n", self.status().code(), self.status().reason())
            }
        }
    };
}

http_errors! {
    BadRequest => StatusCode::BadRequest;
    Forbidden => StatusCode::Forbidden;
    NotFound => StatusCode::NotFound;
    MethodNotAllowed => StatusCode::MethodNotAllowed;
    LengthRequired => StatusCode::LengthRequired;
    PayloadTooLarge => StatusCode::PayloadTooLarge;
    Internal => StatusCode::InternalServerError;
    NotImplemented => StatusCode::NotImplemented;
}

impl From<ParseOutcome> for ErrorKind {
    fn from(p: ParseOutcome) -> Self {
        match p {
            ParseOutcome::BadRequest => ErrorKind::BadRequest,
            ParseOutcome::NotImplemented => ErrorKind::NotImplemented,
            ParseOutcome::LengthRequired => ErrorKind::LengthRequired,
            ParseOutcome::EntityTooLarge => ErrorKind::PayloadTooLarge,
            ParseOutcome::NeedMore => unreachable!("NeedMore is not a terminal outcome"),
        }
    }
}

/// Resolves a server's configured `error_page` for this kind's status
/// code, if any, so the caller can try serving that file before falling
/// back to [`ErrorKind::default_body`].
pub fn configured_error_page<'a>(error_pages: &'a std::collections::HashMap<u16, String>, kind: ErrorKind) -> Option<&'a str> {
    error_pages.get(&kind.status().code()).map(|s| s.as_str())
}

/// Renders the canned plain-text error response for a kind with no
/// matching `error_page`, or no file mapping the handler could use.
pub fn render_default(kind: ErrorKind, keep_alive: bool) -> Vec<u8> {
    let mut builder = crate::http::ResponseBuilder::new(kind.status());
    builder.connection(keep_alive);
    builder.body("text/plain; charset=utf-8", kind.default_body().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_outcomes_map_to_expected_status_codes() {
        assert_eq!(ErrorKind::from(ParseOutcome::BadRequest).status().code(), 400);
        assert_eq!(ErrorKind::from(ParseOutcome::LengthRequired).status().code(), 411);
        assert_eq!(ErrorKind::from(ParseOutcome::EntityTooLarge).status().code(), 413);
        assert_eq!(ErrorKind::from(ParseOutcome::NotImplemented).status().code(), 501);
    }

    #[test]
    fn render_default_produces_plain_text_body() {
        let out = render_default(ErrorKind::NotFound, false);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("text/plain"));
        assert!(text.ends_with("404 Not Found\n"));
    }
}
