//! Upload handling: writes a POST body to a generated file under the
//! configured upload store.
//!
//! Grounded on `original_source/src/http/Connection.cpp`'s upload
//! branch: `up_<unix_time>_<pid>_<random>` naming, mode 0644,
//! create-truncate-write semantics, directories created with 0755.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::{Location, ServerConfig};
use crate::path_safety::join;

pub struct UploadResult {
    pub status: u16,
    pub body: String,
    pub location_header: Option<String>,
}

fn store_dir(server: &ServerConfig, location: &Location) -> String {
    let store = location.upload_store.as_deref().unwrap_or("uploads");
    if store.starts_with('/') {
        store.to_string()
    } else {
        join(&server.root, store)
    }
}

fn generate_filename(now: SystemTime, pid: u32, random: u32) -> String {
    let secs = now.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    format!("up_{secs}_{pid}_{random}")
}

pub fn handle(server: &ServerConfig, location: &Location, body: &[u8], now: SystemTime, random: u32) -> UploadResult {
    let max = location.effective_max_body_size(server);
    if body.len() as u64 > max {
        return UploadResult {
            status: 413,
            body: "413 Payload Too Large\n".to_string(),
            location_header: None,
        };
    }

    let dir = store_dir(server, location);
    if fs::create_dir_all(&dir).is_err() {
        return internal_error();
    }
    set_dir_permissions(&dir);

    let pid = std::process::id();
    let filename = generate_filename(now, pid, random);
    let full_path = Path::new(&dir).join(&filename);

    let Ok(mut file) = fs::File::create(&full_path) else {
        return internal_error();
    };
    if file.write_all(body).is_err() {
        return internal_error();
    }
    set_file_permissions(&full_path);

    UploadResult {
        status: 201,
        body: "201 Created\n".to_string(),
        location_header: Some(format!("/uploads/{filename}")),
    }
}

fn internal_error() -> UploadResult {
    UploadResult {
        status: 500,
        body: "500 Internal Server Error\n".to_string(),
        location_header: None,
    }
}

#[cfg(unix)]
fn set_dir_permissions(path: &str) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = fs::metadata(path) {
        let mut perms = meta.permissions();
        perms.set_mode(0o755);
        let _ = fs::set_permissions(path, perms);
    }
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &str) {}

#[cfg(unix)]
fn set_file_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = fs::metadata(path) {
        let mut perms = meta.permissions();
        perms.set_mode(0o644);
        let _ = fs::set_permissions(path, perms);
    }
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_body_to_generated_filename() {
        let dir = tempdir().unwrap();
        let server = ServerConfig {
            root: dir.path().to_str().unwrap().to_string(),
            ..ServerConfig::default()
        };
        let location = Location {
            upload_enable: true,
            upload_store: Some("uploads".into()),
            ..Location::default()
        };
        let result = handle(&server, &location, b"hello", UNIX_EPOCH, 42);
        assert_eq!(result.status, 201);
        assert!(result.location_header.unwrap().starts_with("/uploads/up_"));

        let entries: Vec<_> = fs::read_dir(dir.path().join("uploads")).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn rejects_body_over_the_effective_limit() {
        let dir = tempdir().unwrap();
        let server = ServerConfig {
            root: dir.path().to_str().unwrap().to_string(),
            client_max_body_size: 4,
            ..ServerConfig::default()
        };
        let location = Location {
            upload_enable: true,
            upload_store: Some("uploads".into()),
            ..Location::default()
        };
        let result = handle(&server, &location, b"too long", UNIX_EPOCH, 1);
        assert_eq!(result.status, 413);
    }
}
