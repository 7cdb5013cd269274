//! Configuration file loading: lexer → parser → validated [`model::Config`].

pub mod lexer;
pub mod model;
pub mod parser;

pub use model::{Config, Location, ServerConfig};
pub use parser::ConfigError;

use std::fs;
use std::path::Path;

/// I/O failures are reported separately from grammar/validation failures
/// so the caller can map them to distinct process exit codes (see the
/// binary entry point).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Parse(#[from] ConfigError),
}

/// Reads and parses a config file from disk.
pub fn load(path: &Path) -> Result<Config, LoadError> {
    let text = fs::read_to_string(path)?;
    let cfg = parser::Parser::new(&text).parse()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_io_error() {
        let err = load(Path::new("/nonexistent/path/to/webserv.conf")).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
