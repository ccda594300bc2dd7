//! Catalog service: accept loop and session lifecycle.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use shareport_protocol::CatalogEntry;

use crate::catalog::scan_share_dir;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::events::ServerEvents;
use crate::session::Session;

/// The catalog service.
///
/// Accepts connections until [`stop`](Self::stop) and runs one session
/// task per socket. Active sessions are registered with cancellation
/// handles: `stop` only interrupts the accept loop and lets in-flight
/// transfers drain, while [`abort_sessions`](Self::abort_sessions)
/// signals the handlers themselves.
pub struct CatalogService<E: ServerEvents> {
    config: ServerConfig,
    events: Arc<E>,
    cancel: CancellationToken,
    local_addr: Mutex<Option<SocketAddr>>,
    sessions: Mutex<HashMap<u64, CancellationToken>>,
    next_session: AtomicU64,
}

impl<E: ServerEvents> CatalogService<E> {
    pub fn new(config: ServerConfig, events: E) -> Arc<Self> {
        Arc::new(Self {
            config,
            events: Arc::new(events),
            cancel: CancellationToken::new(),
            local_addr: Mutex::new(None),
            sessions: Mutex::new(HashMap::new()),
            next_session: AtomicU64::new(1),
        })
    }

    /// Returns the bound address, available once [`run`](Self::run) has
    /// bound the listener.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().await
    }

    /// Returns the listening port (0 if not yet bound).
    pub async fn port(&self) -> u16 {
        self.local_addr.lock().await.map(|a| a.port()).unwrap_or(0)
    }

    /// Stops accepting connections.
    ///
    /// In-flight sessions are not cancelled; they run to natural
    /// completion or socket error.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Cancels every in-flight session through the registry.
    pub async fn abort_sessions(&self) {
        for (_, token) in self.sessions.lock().await.drain() {
            token.cancel();
        }
    }

    /// Number of sessions currently in flight.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Re-enumerates the share directory and notifies the caller.
    pub fn refresh_catalog(&self) -> Result<Vec<CatalogEntry>, ServerError> {
        let entries = scan_share_dir(&self.config.share_dir)?;
        self.events.on_catalog_updated(&entries);
        Ok(entries)
    }

    /// Runs the service until [`stop`](Self::stop).
    ///
    /// Fails with [`ServerError::InvalidDirectory`] before binding if the
    /// share directory does not exist.
    pub async fn run(self: &Arc<Self>) -> Result<(), ServerError> {
        let share_dir = self.config.share_dir.clone();
        if !share_dir.is_dir() {
            return Err(ServerError::InvalidDirectory(share_dir));
        }

        let addr = SocketAddr::new(self.config.bind_host, self.config.port);
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        *self.local_addr.lock().await = Some(local_addr);

        info!(%local_addr, share_dir = %share_dir.display(), "catalog service listening");
        self.events
            .on_log(&format!("Server starting on {local_addr}"));
        self.events.on_log(&format!(
            "Sharing files from directory: {}",
            share_dir.display()
        ));
        self.events
            .on_status(&format!("Server running on {local_addr}"));

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("catalog service shutting down");
                    self.events.on_log("Server stopped");
                    self.events.on_status("Server stopped");
                    break Ok(());
                }

                result = listener.accept() => match result {
                    Ok((stream, peer)) => self.spawn_session(stream, peer).await,
                    Err(e) => {
                        // A single failed accept does not stop the service.
                        error!("accept error: {e}");
                        self.events
                            .on_log(&format!("Error accepting connection: {e}"));
                    }
                }
            }
        }
    }

    async fn spawn_session(self: &Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        // Session tokens are not children of the accept-loop token:
        // stop() leaves in-flight transfers alone.
        let token = CancellationToken::new();
        self.sessions.lock().await.insert(id, token.clone());

        let service = Arc::clone(self);
        tokio::spawn(async move {
            let session = Session::new(
                stream,
                peer,
                service.config.share_dir.clone(),
                Arc::clone(&service.events),
                token,
            );
            match session.run().await {
                Ok(()) => {}
                Err(ServerError::Cancelled) => info!(%peer, "session cancelled"),
                Err(e) => {
                    error!(%peer, "session error: {e}");
                    service
                        .events
                        .on_log(&format!("Error handling client {peer}: {e}"));
                }
            }
            service.sessions.lock().await.remove(&id);
        });
    }
}
