//! Turns a parsed request plus its resolved route into response bytes.
//!
//! Grounded on the original `http/Connection.cpp`'s per-request
//! dispatch order (§4.10): Host check, route resolution, method gate,
//! location `return`, upload, CGI, static, delete — tried in that
//! order, first match wins.

use std::fs;
use std::time::SystemTime;

use crate::config::{Config, Location, ServerConfig};
use crate::errors::{configured_error_page, render_default, ErrorKind};
use crate::handlers::{cgi, delete, static_handler, upload};
use crate::http::request::Request;
use crate::http::types::{Method, StatusCode, Version};
use crate::http::ResponseBuilder;
use crate::router;

pub const MAX_KEEPALIVE_REQUESTS: u32 = 100;

pub struct Dispatched {
    pub bytes: Vec<u8>,
    pub keep_alive: bool,
}

pub fn dispatch(
    cfg: &Config,
    listener_host: &str,
    listener_port: u16,
    request: &Request,
    request_count: u32,
    now: SystemTime,
    random: u32,
) -> Dispatched {
    let keep_alive = resolve_keep_alive(request, request_count);

    let host_header = request.headers.get("host").unwrap_or("").to_string();
    if request.version == Version::Http11 && host_header.is_empty() {
        return Dispatched {
            bytes: error_response(None, ErrorKind::BadRequest, keep_alive),
            keep_alive,
        };
    }

    let server = router::pick_server(cfg, listener_host, listener_port, &host_header);
    let path = router::path_without_query(&request.target).to_string();
    let query = request.target.find('?').map(|i| &request.target[i + 1..]).unwrap_or("");
    let location = router::pick_location(server, &path);

    if !matches!(request.method, Method::Get | Method::Post | Method::Delete | Method::Head) {
        return Dispatched {
            bytes: error_response(Some(server), ErrorKind::NotImplemented, keep_alive),
            keep_alive,
        };
    }

    if let Some(loc) = location {
        let method_str = request.method.as_str();
        if !router::method_allowed(loc, method_str) {
            let mut builder = ResponseBuilder::new(StatusCode::MethodNotAllowed);
            builder.connection(keep_alive);
            builder.header("Allow", &router::allow_header_value(loc));
            return Dispatched {
                bytes: builder.body("text/plain; charset=utf-8", ErrorKind::MethodNotAllowed.default_body().as_bytes()),
                keep_alive,
            };
        }

        if let Some(code) = loc.return_code {
            if (300..400).contains(&code) {
                if let Some(url) = &loc.return_url {
                    let mut builder = ResponseBuilder::new(status_from_code(code));
                    builder.connection(keep_alive);
                    builder.header("Location", url);
                    return Dispatched {
                        bytes: builder.body("text/html; charset=utf-8", b""),
                        keep_alive,
                    };
                }
            }
        }

        if matches!(request.method, Method::Post) && loc.upload_enable && loc.upload_store.is_some() {
            let result = upload::handle(server, loc, &request.body, now, random);
            let mut builder = ResponseBuilder::new(status_from_code(result.status));
            builder.connection(keep_alive);
            if let Some(loc_hdr) = &result.location_header {
                builder.header("Location", loc_hdr);
            }
            return Dispatched {
                bytes: builder.body("text/plain; charset=utf-8", result.body.as_bytes()),
                keep_alive,
            };
        }

        if cgi::matches(loc, &path) {
            let result = cgi::handle(server, loc, request.method.as_str(), &path, query, &request.headers, &request.body);
            let content_type = result
                .headers
                .iter()
                .find(|(k, _)| k == "content-type")
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| "text/html; charset=utf-8".to_string());
            let has_length = result.headers.iter().any(|(k, _)| k == "content-length");

            let mut builder = ResponseBuilder::new(status_from_code(result.status));
            builder.connection(keep_alive);
            for (k, v) in &result.headers {
                if k == "content-type" || k == "content-length" {
                    continue;
                }
                builder.header(&header_case(k), v);
            }

            let body = if matches!(request.method, Method::Head) { &[][..] } else { &result.body[..] };
            let bytes = if has_length {
                builder.body(&content_type, body)
            } else {
                builder.chunked_body(&content_type, body)
            };
            return Dispatched { bytes, keep_alive };
        }
    }

    if matches!(request.method, Method::Delete) {
        let result = delete::handle(server, location, &path);
        let status = status_from_code(result.status);
        if result.status >= 400 {
            return Dispatched {
                bytes: error_response(Some(server), status_to_kind(result.status), keep_alive),
                keep_alive,
            };
        }
        let mut builder = ResponseBuilder::new(status);
        builder.connection(keep_alive);
        return Dispatched {
            bytes: builder.no_body("text/plain; charset=utf-8", 0),
            keep_alive,
        };
    }

    let mut result = static_handler::handle(server, location, &path, &request.headers);
    if matches!(request.method, Method::Head) {
        static_handler::strip_body_for_head(&mut result);
    }

    if result.status >= 400 {
        return Dispatched {
            bytes: error_response(Some(server), status_to_kind(result.status), keep_alive),
            keep_alive,
        };
    }

    let mut builder = ResponseBuilder::new(status_from_code(result.status));
    builder.connection(keep_alive);
    if let Some(loc_hdr) = &result.location_header {
        builder.header("Location", loc_hdr);
    }
    for (k, v) in &result.extra_headers {
        builder.header(k, v);
    }
    let content_type = if result.content_type.is_empty() {
        "text/html; charset=utf-8".to_string()
    } else {
        result.content_type.clone()
    };
    let bytes = if matches!(request.method, Method::Head) {
        builder.no_body(&content_type, result.body.len())
    } else {
        builder.body(&content_type, &result.body)
    };
    Dispatched { bytes, keep_alive }
}

fn resolve_keep_alive(request: &Request, request_count: u32) -> bool {
    if request_count + 1 >= MAX_KEEPALIVE_REQUESTS {
        return false;
    }
    match request.headers.get("connection") {
        Some(v) if v.eq_ignore_ascii_case("close") => false,
        Some(v) if v.eq_ignore_ascii_case("keep-alive") => true,
        // HTTP/1.1 defaults to keep-alive, HTTP/1.0 defaults to close.
        _ => request.version == Version::Http11,
    }
}

fn status_from_code(code: u16) -> StatusCode {
    match code {
        200 => StatusCode::Ok,
        201 => StatusCode::Created,
        204 => StatusCode::NoContent,
        301 => StatusCode::MovedPermanently,
        302 => StatusCode::Found,
        303 => StatusCode::SeeOther,
        304 => StatusCode::NotModified,
        400 => StatusCode::BadRequest,
        403 => StatusCode::Forbidden,
        404 => StatusCode::NotFound,
        405 => StatusCode::MethodNotAllowed,
        411 => StatusCode::LengthRequired,
        413 => StatusCode::PayloadTooLarge,
        414 => StatusCode::UriTooLong,
        501 => StatusCode::NotImplemented,
        502 => StatusCode::BadGateway,
        503 => StatusCode::ServiceUnavailable,
        504 => StatusCode::GatewayTimeout,
        505 => StatusCode::HttpVersionNotSupported,
        _ => StatusCode::InternalServerError,
    }
}

fn status_to_kind(code: u16) -> ErrorKind {
    match code {
        400 => ErrorKind::BadRequest,
        403 => ErrorKind::Forbidden,
        404 => ErrorKind::NotFound,
        405 => ErrorKind::MethodNotAllowed,
        411 => ErrorKind::LengthRequired,
        413 => ErrorKind::PayloadTooLarge,
        501 => ErrorKind::NotImplemented,
        _ => ErrorKind::Internal,
    }
}

fn header_case(lower: &str) -> String {
    lower
        .split('-')
        .map(|part| {
            let mut c = part.chars();
            match c.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + c.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

pub fn error_response(server: Option<&ServerConfig>, kind: ErrorKind, keep_alive: bool) -> Vec<u8> {
    if let Some(srv) = server {
        if let Some(page) = configured_error_page(&srv.error_pages, kind) {
            let resolved = crate::path_safety::join(&srv.root, page.trim_start_matches('/'));
            if let Ok(body) = fs::read(&resolved) {
                let mut builder = ResponseBuilder::new(kind.status());
                builder.connection(keep_alive);
                return builder.body("text/html; charset=utf-8", &body);
            }
        }
    }
    render_default(kind, keep_alive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::types::HeaderMap;
    use std::time::UNIX_EPOCH;
    use tempfile::tempdir;

    fn basic_config(root: &str) -> Config {
        Config {
            servers: vec![ServerConfig {
                host: "0.0.0.0".into(),
                port: 80,
                root: root.to_string(),
                locations: vec![Location {
                    path: "/".into(),
                    allow_methods: vec!["GET".into(), "POST".into(), "DELETE".into()],
                    index: vec!["index.html".into()],
                    ..Location::default()
                }],
                ..ServerConfig::default()
            }],
        }
    }

    fn get_request(target: &str) -> Request {
        Request {
            method: Method::Get,
            version: Version::Http11,
            raw_target: target.to_string(),
            target: target.to_string(),
            headers: {
                let mut h = HeaderMap::new();
                h.push("Host", "example.com");
                h
            },
            body: Vec::new(),
        }
    }

    #[test]
    fn serves_static_file_on_get() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"hi").unwrap();
        let cfg = basic_config(dir.path().to_str().unwrap());
        let req = get_request("/a.txt");
        let out = dispatch(&cfg, "0.0.0.0", 80, &req, 0, UNIX_EPOCH, 1);
        let text = String::from_utf8(out.bytes).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.ends_with("hi"));
        assert!(out.keep_alive);
    }

    #[test]
    fn missing_host_on_http11_is_bad_request() {
        let dir = tempdir().unwrap();
        let cfg = basic_config(dir.path().to_str().unwrap());
        let mut req = get_request("/a.txt");
        req.headers = HeaderMap::new();
        let out = dispatch(&cfg, "0.0.0.0", 80, &req, 0, UNIX_EPOCH, 1);
        let text = String::from_utf8(out.bytes).unwrap();
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn method_not_allowed_reports_allow_header() {
        let dir = tempdir().unwrap();
        let mut cfg = basic_config(dir.path().to_str().unwrap());
        cfg.servers[0].locations[0].allow_methods = vec!["GET".into()];
        let mut req = get_request("/a.txt");
        req.method = Method::Delete;
        let out = dispatch(&cfg, "0.0.0.0", 80, &req, 0, UNIX_EPOCH, 1);
        let text = String::from_utf8(out.bytes).unwrap();
        assert!(text.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
        assert!(text.contains("Allow: GET, HEAD\r\n"));
    }

    #[test]
    fn keep_alive_forced_off_at_request_limit() {
        let dir = tempdir().unwrap();
        let cfg = basic_config(dir.path().to_str().unwrap());
        let req = get_request("/index.html");
        fs::write(dir.path().join("index.html"), b"x").unwrap();
        let out = dispatch(&cfg, "0.0.0.0", 80, &req, MAX_KEEPALIVE_REQUESTS - 1, UNIX_EPOCH, 1);
        assert!(!out.keep_alive);
    }
}
