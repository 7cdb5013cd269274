//! IMF-fixdate formatting and parsing, shared by the response builder's
//! `Date` header and the static handler's `Last-Modified` / `If-Modified-Since`
//! comparison.
//!
//! Delegates to [`httpdate`], which implements exactly this RFC 7231 format.

use std::time::SystemTime;

/// Formats the current time as IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn http_date_now() -> String {
    httpdate::fmt_http_date(SystemTime::now())
}

/// Formats an arbitrary [`SystemTime`] as IMF-fixdate.
pub fn http_date_from(t: SystemTime) -> String {
    httpdate::fmt_http_date(t)
}

/// Parses an IMF-fixdate string, returning `None` on any malformation.
pub fn parse_http_date(s: &str) -> Option<SystemTime> {
    httpdate::parse_http_date(s).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn round_trips_through_format_and_parse() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let formatted = http_date_from(t);
        let parsed = parse_http_date(&formatted).unwrap();
        assert_eq!(parsed, t);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse_http_date("not a date").is_none());
        assert!(parse_http_date("").is_none());
    }
}
