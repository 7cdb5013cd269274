//! Static file and directory serving, including conditional GET.
//!
//! Grounded on `original_source/src/http/StaticHandler.cpp`: the weak
//! ETag format, the mtime-based `If-Modified-Since` comparison, the
//! index-file trial order, and the directory-without-trailing-slash
//! redirect. The autoindex listing deliberately omits a `../` entry at
//! the filesystem root but includes one everywhere else, per the
//! decision recorded for the divergent-revision open question.

use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::config::{Location, ServerConfig};
use crate::date::{http_date_from, parse_http_date};
use crate::handlers::mapping;
use crate::http::types::HeaderMap;
use crate::mime::mime_by_ext;

pub struct StaticResult {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
    pub location_header: Option<String>,
    pub extra_headers: Vec<(String, String)>,
}

/// The canonical serialized form: `"W/<size>-<mtime>"`.
fn weak_etag(len: u64, mtime_secs: u64) -> String {
    format!("\"W/{len}-{mtime_secs}\"")
}

/// The standard weak-ETag serialization some clients round-trip instead:
/// `W/"<size>-<mtime>"`.
fn weak_etag_alt(len: u64, mtime_secs: u64) -> String {
    format!("W/\"{len}-{mtime_secs}\"")
}

fn mtime_secs(meta: &fs::Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn serve_file(path: &str, headers: &HeaderMap) -> StaticResult {
    let meta = match fs::metadata(path) {
        Ok(m) => m,
        Err(_) => return not_found(),
    };
    let len = meta.len();
    let mtime = mtime_secs(&meta);
    let etag = weak_etag(len, mtime);
    let last_modified = http_date_from(meta.modified().unwrap_or(UNIX_EPOCH));

    if let Some(inm) = headers.get("if-none-match") {
        if inm == etag || inm == weak_etag_alt(len, mtime) {
            return not_modified(etag, last_modified);
        }
    } else if let Some(ims) = headers.get("if-modified-since") {
        if let Some(since) = parse_http_date(ims) {
            let since_secs = since.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
            if mtime <= since_secs {
                return not_modified(etag, last_modified);
            }
        }
    }

    let body = fs::read(path).unwrap_or_default();
    StaticResult {
        status: 200,
        content_type: mime_by_ext(path).to_string(),
        body,
        location_header: None,
        extra_headers: vec![("ETag".to_string(), etag), ("Last-Modified".to_string(), last_modified)],
    }
}

fn not_modified(etag: String, last_modified: String) -> StaticResult {
    StaticResult {
        status: 304,
        content_type: String::new(),
        body: Vec::new(),
        location_header: None,
        extra_headers: vec![("ETag".to_string(), etag), ("Last-Modified".to_string(), last_modified)],
    }
}

fn not_found() -> StaticResult {
    StaticResult {
        status: 404,
        content_type: "text/html; charset=utf-8".to_string(),
        body: Vec::new(),
        location_header: None,
        extra_headers: Vec::new(),
    }
}

fn forbidden() -> StaticResult {
    StaticResult {
        status: 403,
        content_type: "text/html; charset=utf-8".to_string(),
        body: Vec::new(),
        location_header: None,
        extra_headers: Vec::new(),
    }
}

fn render_autoindex(dir_fs_path: &str, request_path: &str, base: &str) -> StaticResult {
    let entries = match fs::read_dir(dir_fs_path) {
        Ok(r) => r,
        Err(_) => return forbidden(),
    };

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    let mut html = String::new();
    html.push_str(&format!("<html><head><title>Index of {request_path}</title></head><body>\n"));
    html.push_str(&format!("<h1>Index of {request_path}</h1>\n<ul>\n"));

    let norm_dir = crate::path_safety::normalize(dir_fs_path);
    let norm_base = crate::path_safety::normalize(base);
    if norm_dir != norm_base {
        html.push_str("<li><a href=\"../\">../</a></li>\n");
    }

    for name in names {
        html.push_str(&format!("<li><a href=\"{name}\">{name}</a></li>\n"));
    }
    html.push_str("</ul></body></html>");

    StaticResult {
        status: 200,
        content_type: "text/html; charset=utf-8".to_string(),
        body: html.into_bytes(),
        location_header: None,
        extra_headers: Vec::new(),
    }
}

pub fn handle(server: &ServerConfig, location: Option<&Location>, request_path: &str, headers: &HeaderMap) -> StaticResult {
    let Some(mapped) = mapping::resolve(server, location, request_path) else {
        return forbidden();
    };

    let meta = fs::metadata(&mapped.fs_path);
    let ends_with_slash = request_path.ends_with('/');

    match meta {
        Ok(m) if m.is_file() && !ends_with_slash => serve_file(&mapped.fs_path, headers),
        Ok(m) if m.is_dir() => {
            if !ends_with_slash {
                return StaticResult {
                    status: 301,
                    content_type: "text/html; charset=utf-8".to_string(),
                    body: Vec::new(),
                    location_header: Some(format!("{request_path}/")),
                    extra_headers: Vec::new(),
                };
            }

            let index_names = location.map(|l| l.index.as_slice()).unwrap_or(&[]);
            for name in index_names {
                let candidate = Path::new(&mapped.fs_path).join(name);
                if candidate.is_file() {
                    return serve_file(&candidate.to_string_lossy(), headers);
                }
            }

            if location.map(|l| l.autoindex).unwrap_or(false) {
                render_autoindex(&mapped.fs_path, request_path, &mapped.base)
            } else {
                forbidden()
            }
        }
        Ok(_) => not_found(),
        Err(_) => not_found(),
    }
}

/// For `HEAD` requests: same headers, empty body, `Content-Length`
/// preserved as if the body had been sent.
pub fn strip_body_for_head(result: &mut StaticResult) {
    result.body.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn server_with_root(root: &str) -> ServerConfig {
        ServerConfig {
            root: root.to_string(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn serves_a_regular_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("index.html"), b"<h1>hi</h1>").unwrap();
        let srv = server_with_root(dir.path().to_str().unwrap());
        let headers = HeaderMap::new();
        let result = handle(&srv, None, "/index.html", &headers);
        assert_eq!(result.status, 200);
        assert_eq!(result.body, b"<h1>hi</h1>");
        assert_eq!(result.content_type, "text/html; charset=utf-8");
    }

    #[test]
    fn missing_file_is_404() {
        let dir = tempdir().unwrap();
        let srv = server_with_root(dir.path().to_str().unwrap());
        let result = handle(&srv, None, "/missing.html", &HeaderMap::new());
        assert_eq!(result.status, 404);
    }

    #[test]
    fn directory_without_trailing_slash_redirects() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let srv = server_with_root(dir.path().to_str().unwrap());
        let result = handle(&srv, None, "/sub", &HeaderMap::new());
        assert_eq!(result.status, 301);
        assert_eq!(result.location_header.as_deref(), Some("/sub/"));
    }

    #[test]
    fn directory_serves_index_file_when_present() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/index.html"), b"idx").unwrap();
        let loc = Location {
            path: "/".into(),
            index: vec!["index.html".into()],
            ..Location::default()
        };
        let srv = server_with_root(dir.path().to_str().unwrap());
        let result = handle(&srv, Some(&loc), "/sub/", &HeaderMap::new());
        assert_eq!(result.status, 200);
        assert_eq!(result.body, b"idx");
    }

    #[test]
    fn directory_without_index_or_autoindex_is_forbidden() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let srv = server_with_root(dir.path().to_str().unwrap());
        let result = handle(&srv, None, "/sub/", &HeaderMap::new());
        assert_eq!(result.status, 403);
    }

    #[test]
    fn conditional_get_returns_not_modified() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"data").unwrap();
        let srv = server_with_root(dir.path().to_str().unwrap());
        let first = handle(&srv, None, "/a.txt", &HeaderMap::new());
        let etag = first.extra_headers.iter().find(|(k, _)| k == "ETag").unwrap().1.clone();

        let mut headers = HeaderMap::new();
        headers.push("If-None-Match", etag);
        let second = handle(&srv, None, "/a.txt", &headers);
        assert_eq!(second.status, 304);
    }
}
