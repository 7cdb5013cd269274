//! DELETE handling: removes a single regular file mapped onto the
//! filesystem. A mapped target that isn't a regular file (a directory)
//! is reported as not found rather than forbidden.

use std::fs;

use crate::config::{Location, ServerConfig};
use crate::handlers::mapping;

pub struct DeleteResult {
    pub status: u16,
}

pub fn handle(server: &ServerConfig, location: Option<&Location>, request_path: &str) -> DeleteResult {
    let Some(mapped) = mapping::resolve(server, location, request_path) else {
        return DeleteResult { status: 403 };
    };

    match fs::metadata(&mapped.fs_path) {
        Ok(m) if m.is_file() => match fs::remove_file(&mapped.fs_path) {
            Ok(()) => DeleteResult { status: 204 },
            Err(_) => DeleteResult { status: 500 },
        },
        Ok(_) => DeleteResult { status: 404 },
        Err(_) => DeleteResult { status: 404 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;
    use tempfile::tempdir;

    #[test]
    fn deletes_an_existing_file() {
        let dir = tempdir().unwrap();
        stdfs::write(dir.path().join("a.txt"), b"x").unwrap();
        let server = ServerConfig {
            root: dir.path().to_str().unwrap().to_string(),
            ..ServerConfig::default()
        };
        let result = handle(&server, None, "/a.txt");
        assert_eq!(result.status, 204);
        assert!(!dir.path().join("a.txt").exists());
    }

    #[test]
    fn missing_file_is_404() {
        let dir = tempdir().unwrap();
        let server = ServerConfig {
            root: dir.path().to_str().unwrap().to_string(),
            ..ServerConfig::default()
        };
        let result = handle(&server, None, "/missing.txt");
        assert_eq!(result.status, 404);
    }

    #[test]
    fn directory_is_not_found() {
        let dir = tempdir().unwrap();
        stdfs::create_dir(dir.path().join("sub")).unwrap();
        let server = ServerConfig {
            root: dir.path().to_str().unwrap().to_string(),
            ..ServerConfig::default()
        };
        let result = handle(&server, None, "/sub");
        assert_eq!(result.status, 404);
    }
}
