//! Maps a request path onto a filesystem path, enforcing the sandbox.
//!
//! Grounded on `original_source/src/fs/Path.cpp` and the static
//! handler's mapping rule: strip the matched location prefix, join the
//! remainder onto `alias`/`location.root`/`server.root` (in that
//! order), and reject anything that normalizes outside the chosen base.

use crate::config::{Location, ServerConfig};
use crate::path_safety::{join, normalize, starts_with_path, url_decode_lenient};
use crate::router::is_prefix_on_boundary;

pub struct Mapped {
    pub fs_path: String,
    pub base: String,
}

/// Returns `None` if the request path normalizes outside the applicable
/// base directory (path traversal, or an `alias`/`root` escape).
///
/// `request_path` is percent-decoded before it touches the filesystem,
/// so `%2e%2e` is caught by the same `..` check as a literal `../` and
/// a request for `/a%20b.html` resolves to the file named `a b.html`.
pub fn resolve(server: &ServerConfig, location: Option<&Location>, request_path: &str) -> Option<Mapped> {
    let decoded = url_decode_lenient(request_path);
    if decoded.contains("..") {
        return None;
    }

    let (base, tail) = match location {
        Some(loc) if is_prefix_on_boundary(&loc.path, &decoded) => {
            let stripped = &decoded[loc.path.len()..];
            let stripped = stripped.strip_prefix('/').unwrap_or(stripped);
            let base = loc
                .alias
                .clone()
                .or_else(|| loc.root.clone())
                .unwrap_or_else(|| server.root.clone());
            (base, stripped.to_string())
        }
        _ => {
            let tail = decoded.strip_prefix('/').unwrap_or(&decoded);
            (server.root.clone(), tail.to_string())
        }
    };

    let fs_path = join(&base, &tail);
    let norm_fs = normalize(&join("/", &fs_path));
    let norm_base = normalize(&join("/", &base));

    if !starts_with_path(&norm_base, &norm_fs) {
        return None;
    }

    Some(Mapped { fs_path, base })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> ServerConfig {
        ServerConfig {
            root: "./site".into(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn maps_under_server_root_with_no_location() {
        let m = resolve(&server(), None, "/a/b.html").unwrap();
        assert_eq!(m.fs_path, "./site/a/b.html");
    }

    #[test]
    fn strips_location_prefix_and_uses_alias() {
        let loc = Location {
            path: "/static".into(),
            alias: Some("./assets".into()),
            ..Location::default()
        };
        let m = resolve(&server(), Some(&loc), "/static/css/a.css").unwrap();
        assert_eq!(m.fs_path, "./assets/css/a.css");
    }

    #[test]
    fn rejects_traversal_attempts() {
        assert!(resolve(&server(), None, "/../../etc/passwd").is_none());
        assert!(resolve(&server(), None, "/a/%2e%2e/%2e%2e/etc").is_none());
    }
}
