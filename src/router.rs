//! Virtual-host and location routing.
//!
//! Grounded on `original_source/src/http/Router.cpp`: `hostFromHeader`
//! strips a trailing `:port` at the last colon, `pickServer` prefers an
//! exact `server_name` match, falls back to the first server bound to
//! the `(host, port)` pair, and finally falls back to the first server
//! in the config as an ill-configured-deployment safety net;
//! `pickLocation` does a longest-prefix match on a `/`-boundary.

use crate::config::{Config, Location, ServerConfig};

/// Strips a trailing `:port` suffix from a `Host` header value, matching
/// the original's "split on the last colon" behavior (correct for
/// IPv4/hostname hosts; the server does not support IPv6 literals).
pub fn host_from_header(host_header: &str) -> &str {
    match host_header.rfind(':') {
        Some(i) => &host_header[..i],
        None => host_header,
    }
}

pub fn pick_server<'a>(cfg: &'a Config, listener_host: &str, listener_port: u16, host_header: &str) -> &'a ServerConfig {
    let bare_host = host_from_header(host_header);
    let mut first_for_pair: Option<&ServerConfig> = None;

    for srv in &cfg.servers {
        if srv.host != listener_host || srv.port != listener_port {
            continue;
        }
        if first_for_pair.is_none() {
            first_for_pair = Some(srv);
        }
        if srv.server_names.iter().any(|n| n == bare_host) {
            return srv;
        }
    }

    first_for_pair.unwrap_or(&cfg.servers[0])
}

/// Strips a query string at the first `?`, matching `resolve()`'s
/// `pathOnly` preprocessing before location lookup.
pub fn path_without_query(target: &str) -> &str {
    match target.find('?') {
        Some(i) => &target[..i],
        None => target,
    }
}

pub fn pick_location<'a>(server: &'a ServerConfig, path: &str) -> Option<&'a Location> {
    server
        .locations
        .iter()
        .filter(|loc| is_prefix_on_boundary(&loc.path, path))
        .max_by_key(|loc| loc.path.len())
}

pub(crate) fn is_prefix_on_boundary(prefix: &str, path: &str) -> bool {
    if prefix.len() > path.len() || !path.starts_with(prefix) {
        return false;
    }
    prefix.len() == path.len() || prefix.ends_with('/') || path.as_bytes()[prefix.len()] == b'/'
}

/// A method is allowed at a location if `allow_methods` names it, with
/// `HEAD` additionally allowed whenever `GET` is.
pub fn method_allowed(location: &Location, method: &str) -> bool {
    if method == "HEAD" {
        return location.allow_methods.iter().any(|m| m == "GET");
    }
    location.allow_methods.iter().any(|m| m == method)
}

/// Builds the `Allow:` header value: the configured methods plus `HEAD`
/// whenever `GET` is present.
pub fn allow_header_value(location: &Location) -> String {
    let mut methods = location.allow_methods.clone();
    if methods.iter().any(|m| m == "GET") && !methods.iter().any(|m| m == "HEAD") {
        methods.push("HEAD".to_string());
    }
    methods.join(", ")
}
