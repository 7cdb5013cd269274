//! Process entry point: argument parsing, config loading, and the
//! runtime boot.
//!
//! Grounded on `original_source/src/main.cpp` and `core/App.cpp`:
//! default config path, `-h`/`--help` usage text, and the distinct
//! exit codes for a missing/unreadable file (1), a grammar/validation
//! error (2), and a listener bind failure (3).

use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info};
use webserv::config;

const DEFAULT_CONFIG_PATH: &str = "demos/basic.conf";

fn usage() -> String {
    format!(
        "usage: webserv [config-file]\n\n\
         Serves files and runs CGI scripts per an nginx-style config file.\n\
         Defaults to {DEFAULT_CONFIG_PATH} when no path is given.\n"
    )
}

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let first = args.next();

    if matches!(first.as_deref(), Some("-h") | Some("--help")) {
        print!("{}", usage());
        return ExitCode::SUCCESS;
    }

    let config_path = PathBuf::from(first.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()));

    info!("loading configuration from {}", config_path.display());
    let cfg = match config::load(&config_path) {
        Ok(cfg) => cfg,
        Err(config::LoadError::Io(e)) => {
            error!("cannot read {}: {e}", config_path.display());
            return ExitCode::from(1);
        }
        Err(config::LoadError::Parse(e)) => {
            error!("{e}");
            return ExitCode::from(2);
        }
    };

    match run_server(cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("failed to start listeners: {e}");
            ExitCode::from(3)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn run_server(cfg: config::Config) -> std::io::Result<()> {
    webserv::server::listener::run(cfg).await
}
