//! Binds one listener per distinct `(host, port)` pair in the config
//! and spawns a connection task per accepted socket.
//!
//! Grounded on `original_source/src/core/App.cpp`'s `initFromConfig`:
//! multiple virtual hosts may share a listener; binding is deduplicated
//! by `(host, port)`, and the router (not the listener) decides which
//! `ServerConfig` handles a given connection.

use std::collections::HashSet;
use std::sync::Arc;

use log::{error, info};
use tokio::net::TcpListener;

use crate::config::Config;
use crate::server::connection::Connection;

pub async fn run(cfg: Config) -> std::io::Result<()> {
    let cfg = Arc::new(cfg);
    let mut seen: HashSet<(String, u16)> = HashSet::new();
    let mut listeners = Vec::new();

    for srv in &cfg.servers {
        let key = (srv.host.clone(), srv.port);
        if !seen.insert(key.clone()) {
            continue;
        }
        let addr = format!("{}:{}", srv.host, srv.port);
        let listener = TcpListener::bind(addr.as_str()).await?;
        info!("listening on {addr}");
        listeners.push((listener, srv.host.clone(), srv.port));
    }

    let mut tasks = Vec::new();
    for (listener, host, port) in listeners {
        let cfg = Arc::clone(&cfg);
        tasks.push(tokio::spawn(accept_loop(listener, cfg, host, port)));
    }

    for task in tasks {
        let _ = task.await;
    }

    Ok(())
}

async fn accept_loop(listener: TcpListener, cfg: Arc<Config>, host: String, port: u16) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                log::debug!("accepted connection from {peer}");
                let cfg = Arc::clone(&cfg);
                let host = host.clone();
                tokio::spawn(async move {
                    Connection::new(stream, cfg, host, port).run().await;
                });
            }
            Err(e) => {
                error!("accept failed: {e}");
            }
        }
    }
}
