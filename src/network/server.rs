//! TCP Server
//!
//! Accepts connections and serves each on its own thread.

use std::fs;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::Config;
use crate::error::Result;
use crate::network::UserLocks;
use crate::transfer::Streamer;
use super::session::{Session, Shared};

/// Reference backup server
pub struct Server {
    config: Config,
    listener: TcpListener,
    local_addr: SocketAddr,
    shared: Arc<Shared>,
    shutdown: AtomicBool,
}

impl Server {
    /// Create the storage root and bind the listen address
    pub fn bind(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.root_dir)?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        let local_addr = listener.local_addr()?;

        let shared = Arc::new(Shared {
            root_dir: config.root_dir.clone(),
            list_file_name: config.list_file_name.clone(),
            streamer: Streamer::new(config.chunk_size)?,
            locks: UserLocks::new(),
        });

        tracing::info!(
            "Server bound to {}, storing files under {}",
            local_addr,
            config.root_dir.display()
        );

        Ok(Self {
            config,
            listener,
            local_addr,
            shared,
            shutdown: AtomicBool::new(false),
        })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until [`shutdown`](Self::shutdown) is called (blocking)
    ///
    /// Sessions already in progress are waited for before returning.
    pub fn run(&self) -> Result<()> {
        tracing::info!("Server listening on {}", self.local_addr);
        let mut sessions: Vec<JoinHandle<()>> = Vec::new();

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    continue;
                }
            };

            let mut session = match Session::new(stream, Arc::clone(&self.shared)) {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!("Failed to set up connection: {}", e);
                    continue;
                }
            };
            if let Err(e) =
                session.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)
            {
                tracing::warn!("Failed to set timeouts for {}: {}", session.peer_addr(), e);
                continue;
            }

            tracing::info!("Connection accepted from {}", session.peer_addr());
            sessions.retain(|handle| !handle.is_finished());
            sessions.push(thread::spawn(move || {
                let peer = session.peer_addr().to_string();
                if let Err(e) = session.handle() {
                    tracing::warn!("Session with {} failed: {}", peer, e);
                }
            }));
        }

        tracing::info!(
            "Server stopped accepting connections, waiting for {} session(s)",
            sessions.len()
        );
        for handle in sessions {
            if handle.join().is_err() {
                tracing::warn!("Session thread panicked");
            }
        }
        Ok(())
    }

    /// Signal the server to stop after the current accept
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }

        // Wake the blocking accept
        let mut wake = self.local_addr;
        if wake.ip().is_unspecified() {
            wake.set_ip(match wake.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            });
        }
        if let Err(e) = TcpStream::connect(wake) {
            tracing::debug!("Shutdown wake-up connect failed: {}", e);
        }
    }
}
