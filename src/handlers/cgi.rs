//! CGI/1.1 invocation via a blocking child process.
//!
//! Grounded on `original_source/src/http/Cgi.cpp`: two pipes, fork,
//! dup2 onto stdin/stdout, execve with `argv = [cgi_bin, script_path]`.
//! `std::process::Command` performs the fork+dup2+exec sequence for us;
//! the parent still writes the whole body before reading output in a
//! single blocking sequence, which is a deliberate limitation (see
//! the design notes on single-threaded CGI stalls) rather than an
//! oversight — nothing here reaches for `spawn_blocking`.

use std::io::{Read, Write};
use std::process::{Command, Stdio};

use crate::config::{Location, ServerConfig};
use crate::handlers::mapping;
use crate::http::types::HeaderMap;

pub struct CgiResult {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// True when this location's `cgi_ext`/`cgi_bin` are both set and the
/// (query-stripped) request path ends with `cgi_ext`.
pub fn matches(location: &Location, request_path: &str) -> bool {
    match (&location.cgi_ext, &location.cgi_bin) {
        (Some(ext), Some(bin)) if !ext.is_empty() && !bin.is_empty() => request_path.ends_with(ext.as_str()),
        _ => false,
    }
}

fn build_env(
    server: &ServerConfig,
    location: &Location,
    method: &str,
    request_path: &str,
    query: &str,
    script_relative: &str,
    headers: &HeaderMap,
    body_len: usize,
) -> Vec<(String, String)> {
    let mut env = vec![
        ("GATEWAY_INTERFACE".to_string(), "CGI/1.1".to_string()),
        ("SERVER_PROTOCOL".to_string(), "HTTP/1.1".to_string()),
        ("SERVER_SOFTWARE".to_string(), "webserv-dev".to_string()),
        ("REQUEST_METHOD".to_string(), method.to_string()),
        ("SCRIPT_NAME".to_string(), request_path.to_string()),
        ("SCRIPT_FILENAME".to_string(), script_relative.to_string()),
        ("PATH_INFO".to_string(), request_path.to_string()),
        ("QUERY_STRING".to_string(), query.to_string()),
        ("SERVER_NAME".to_string(), server.server_names.first().cloned().unwrap_or_else(|| server.host.clone())),
        ("SERVER_PORT".to_string(), server.port.to_string()),
        ("CONTENT_LENGTH".to_string(), body_len.to_string()),
        ("REDIRECT_STATUS".to_string(), "200".to_string()),
    ];

    if let Some(ct) = headers.get("content-type") {
        env.push(("CONTENT_TYPE".to_string(), ct.to_string()));
    }

    for (name, value) in headers.iter() {
        if name.eq_ignore_ascii_case("content-length") || name.eq_ignore_ascii_case("content-type") {
            continue;
        }
        let key = format!("HTTP_{}", name.to_ascii_uppercase().replace('-', "_"));
        env.push((key, value.to_string()));
    }

    let _ = location;
    env
}

pub fn handle(
    server: &ServerConfig,
    location: &Location,
    method: &str,
    request_path: &str,
    query: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> CgiResult {
    let Some(mapped) = mapping::resolve(server, Some(location), request_path) else {
        return internal_error();
    };
    let script_relative = mapped.fs_path.trim_start_matches('/').to_string();

    let cgi_bin = location.cgi_bin.as_deref().unwrap_or_default();
    let env = build_env(server, location, method, request_path, query, &script_relative, headers, body.len());

    let mut cmd = Command::new(cgi_bin);
    cmd.arg(&script_relative)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .env_clear();
    for (k, v) in &env {
        cmd.env(k, v);
    }

    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(_) => return internal_error(),
    };

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(body);
    }

    let mut out = Vec::new();
    if let Some(mut stdout) = child.stdout.take() {
        let _ = stdout.read_to_end(&mut out);
    }

    let _ = child.wait();

    parse_cgi_output(&out)
}

fn parse_cgi_output(raw: &[u8]) -> CgiResult {
    let (header_block, body) = match memchr::memmem::find(raw, b"\r\n\r\n") {
        Some(i) => (&raw[..i], &raw[i + 4..]),
        None => match memchr::memmem::find(raw, b"\n\n") {
            Some(i) => (&raw[..i], &raw[i + 2..]),
            None => (raw, &raw[raw.len()..]),
        },
    };

    let mut status = 200u16;
    let mut reason = "OK".to_string();
    let mut headers = Vec::new();
    let mut has_content_type = false;

    for line in header_block.split(|&b| b == b'\n') {
        let line = if line.last() == Some(&b'\r') { &line[..line.len() - 1] } else { line };
        if line.is_empty() {
            continue;
        }
        let Some(colon) = memchr::memchr(b':', line) else { continue };
        let name = String::from_utf8_lossy(&line[..colon]).trim().to_ascii_lowercase();
        let value = String::from_utf8_lossy(&line[colon + 1..]).trim_start().to_string();

        if name == "status" {
            let mut parts = value.splitn(2, ' ');
            if let Some(code_str) = parts.next() {
                if let Ok(code) = code_str.parse::<u16>() {
                    status = code;
                    reason = parts.next().unwrap_or("").to_string();
                }
            }
            continue;
        }
        if name == "content-type" {
            has_content_type = true;
        }
        headers.push((name, value));
    }

    if !has_content_type {
        headers.push(("content-type".to_string(), "text/html; charset=utf-8".to_string()));
    }

    CgiResult {
        status,
        reason,
        headers,
        body: body.to_vec(),
    }
}

fn internal_error() -> CgiResult {
    CgiResult {
        status: 500,
        reason: "Internal Server Error".to_string(),
        headers: vec![("content-type".to_string(), "text/html; charset=utf-8".to_string())],
        body: Vec::new(),
    }
}
