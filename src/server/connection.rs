//! Per-connection read→parse→dispatch→write loop.
//!
//! Grounded on the teacher's `server/connection.rs`: a linear
//! `impl_run`-style loop with keep-alive/request-count checks and a
//! `tokio::select!`-guarded write phase, adapted from the teacher's
//! generic `Handler<S>` plugin architecture to a concrete dispatch
//! (see the design notes on the "tagged outcome" simplification) since
//! this server has exactly one connection protocol to drive, not a
//! pluggable set of them.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use log::{debug, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::Config;
use crate::http::request::{ParseOutcome, RequestParser};
use crate::server::dispatch::{dispatch, error_response};

const READ_CHUNK: usize = 16 * 1024;
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);
const IDLE_TIMEOUT: Duration = Duration::from_secs(75);

pub struct Connection {
    stream: TcpStream,
    cfg: Arc<Config>,
    listener_host: String,
    listener_port: u16,
    read_buf: Vec<u8>,
    parser: RequestParser,
    request_count: u32,
}

impl Connection {
    pub fn new(stream: TcpStream, cfg: Arc<Config>, listener_host: String, listener_port: u16) -> Self {
        Self {
            stream,
            cfg,
            listener_host,
            listener_port,
            read_buf: Vec::new(),
            parser: RequestParser::default(),
            request_count: 0,
        }
    }

    pub async fn run(mut self) {
        loop {
            let read = tokio::time::timeout(IDLE_TIMEOUT, self.fill_buffer()).await;
            let n = match read {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => {
                    debug!("connection read error: {e}");
                    return;
                }
                Err(_) => {
                    debug!("connection idle timeout");
                    return;
                }
            };
            if n == 0 {
                return;
            }

            loop {
                let (consumed, outcome) = self.parser.parse(&self.read_buf);
                self.read_buf.drain(..consumed);

                match outcome {
                    Ok(Some(request)) => {
                        let now = SystemTime::now();
                        let random = simple_random();
                        let out = dispatch(
                            &self.cfg,
                            &self.listener_host,
                            self.listener_port,
                            &request,
                            self.request_count,
                            now,
                            random,
                        );
                        self.request_count += 1;
                        if !self.write_all(&out.bytes).await {
                            return;
                        }
                        self.parser.reset();
                        if !out.keep_alive {
                            return;
                        }
                    }
                    Err(ParseOutcome::NeedMore) => break,
                    Err(e) => {
                        let kind = crate::errors::ErrorKind::from(e);
                        let bytes = error_response(None, kind, false);
                        let _ = self.write_all(&bytes).await;
                        return;
                    }
                    Ok(None) => break,
                }
            }
        }
    }

    async fn fill_buffer(&mut self) -> std::io::Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.stream.read(&mut chunk).await?;
        self.read_buf.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    async fn write_all(&mut self, bytes: &[u8]) -> bool {
        match tokio::time::timeout(WRITE_TIMEOUT, self.stream.write_all(bytes)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("connection write error: {e}");
                false
            }
            Err(_) => {
                warn!("connection write timed out");
                false
            }
        }
    }
}

/// A process-wide counter, not cryptographic randomness: good enough
/// for upload filename uniqueness alongside the unix-time and pid
/// components already in the generated name.
fn simple_random() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}
