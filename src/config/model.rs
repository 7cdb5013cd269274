//! The validated configuration tree produced by [`super::parser`].

use std::collections::HashMap;

/// Top-level parsed configuration: an ordered list of virtual hosts.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub servers: Vec<ServerConfig>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub server_names: Vec<String>,
    pub root: String,
    pub error_pages: HashMap<u16, String>,
    pub client_max_body_size: u64,
    pub locations: Vec<Location>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 80,
            server_names: Vec::new(),
            root: ".".to_string(),
            error_pages: HashMap::new(),
            client_max_body_size: 1 << 20,
            locations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Location {
    pub path: String,
    pub allow_methods: Vec<String>,
    pub root: Option<String>,
    pub alias: Option<String>,
    pub index: Vec<String>,
    pub autoindex: bool,
    pub upload_enable: bool,
    pub upload_store: Option<String>,
    pub return_code: Option<u16>,
    pub return_url: Option<String>,
    pub cgi_ext: Option<String>,
    pub cgi_bin: Option<String>,
    pub client_max_body_size: u64,
}

impl Location {
    /// Effective body-size cap for this location: the location's own
    /// setting if nonzero, else the server's, else the 10 MiB default.
    pub fn effective_max_body_size(&self, server: &ServerConfig) -> u64 {
        if self.client_max_body_size != 0 {
            self.client_max_body_size
        } else if server.client_max_body_size != 0 {
            server.client_max_body_size
        } else {
            10 * 1024 * 1024
        }
    }
}
