//! Extension-to-content-type lookup used by the static handler and as
//! the CGI default `Content-Type`.

/// Looks up the MIME type for a path by its final extension.
///
/// Falls back to `application/octet-stream` for unknown or missing
/// extensions. Matching is case-sensitive, matching the reference table
/// this is grounded on.
pub fn mime_by_ext(path: &str) -> &'static str {
    if path.ends_with(".html") || path.ends_with(".htm") {
        "text/html; charset=utf-8"
    } else if path.ends_with(".css") {
        "text/css; charset=utf-8"
    } else if path.ends_with(".js") {
        "application/javascript; charset=utf-8"
    } else if path.ends_with(".json") {
        "application/json; charset=utf-8"
    } else if path.ends_with(".png") {
        "image/png"
    } else if path.ends_with(".jpg") || path.ends_with(".jpeg") {
        "image/jpeg"
    } else if path.ends_with(".gif") {
        "image/gif"
    } else if path.ends_with(".svg") {
        "image/svg+xml"
    } else if path.ends_with(".ico") {
        "image/x-icon"
    } else if path.ends_with(".txt") {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(mime_by_ext("index.html"), "text/html; charset=utf-8");
        assert_eq!(mime_by_ext("a.b.css"), "text/css; charset=utf-8");
        assert_eq!(mime_by_ext("photo.JPG"), "application/octet-stream");
    }

    #[test]
    fn unknown_extension_falls_back() {
        assert_eq!(mime_by_ext("data.bin"), "application/octet-stream");
        assert_eq!(mime_by_ext("noext"), "application/octet-stream");
    }
}
