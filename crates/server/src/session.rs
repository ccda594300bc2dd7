//! Per-connection session handler.
//!
//! Runs the server side of the transfer state machine: send the catalog,
//! take exactly one control message, stream at most one file, close. The
//! socket is closed when the session ends; there is no end-of-stream
//! marker; the receiver terminates on its byte count against the
//! announced size.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use shareport_protocol::{CHUNK_SIZE, Message, read_message, write_message};

use crate::catalog::scan_share_dir;
use crate::error::ServerError;
use crate::events::ServerEvents;

/// Server-side session phases, in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Greeting,
    CatalogSent,
    AwaitingRequest,
    FileInfoSent,
    AwaitingReady,
    Streaming,
    Closed,
}

/// Status line cadence while streaming (every N chunks).
const STATUS_CHUNK_INTERVAL: u64 = 10;

/// One server-side session, owning the accepted socket.
pub(crate) struct Session<E: ServerEvents> {
    stream: TcpStream,
    peer: SocketAddr,
    share_dir: PathBuf,
    events: Arc<E>,
    cancel: CancellationToken,
    state: SessionState,
}

impl<E: ServerEvents> Session<E> {
    pub(crate) fn new(
        stream: TcpStream,
        peer: SocketAddr,
        share_dir: PathBuf,
        events: Arc<E>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            stream,
            peer,
            share_dir,
            events,
            cancel,
            state: SessionState::Greeting,
        }
    }

    /// Drives the session to completion and closes the socket.
    pub(crate) async fn run(mut self) -> Result<(), ServerError> {
        let result = self.drive().await;
        self.set_state(SessionState::Closed);
        result
    }

    async fn drive(&mut self) -> Result<(), ServerError> {
        self.events
            .on_log(&format!("Client connected: {}", self.peer));

        let entries = scan_share_dir(&self.share_dir)?;
        write_message(&mut self.stream, &Message::Catalog(entries)).await?;
        self.set_state(SessionState::CatalogSent);

        self.set_state(SessionState::AwaitingRequest);
        match self.recv().await? {
            Some(Message::Request { name }) => self.serve_request(&name).await,
            Some(Message::Disconnect) => {
                self.events
                    .on_log(&format!("Client {} disconnected", self.peer));
                Ok(())
            }
            Some(other) => {
                self.events.on_log(&format!(
                    "Unknown request from {}: {other:?}",
                    self.peer
                ));
                Ok(())
            }
            // Peer closed without a request; nothing to report.
            None => Ok(()),
        }
    }

    /// Resolves and serves one file request, or answers with an error.
    async fn serve_request(&mut self, name: &str) -> Result<(), ServerError> {
        // The catalog snapshot is a hint only: re-stat at request time.
        let Some((path, size)) = resolve_request(&self.share_dir, name).await else {
            write_message(
                &mut self.stream,
                &Message::Error {
                    message: "File not found".into(),
                },
            )
            .await?;
            self.events.on_log(&format!("File {name} not found"));
            return Ok(());
        };

        write_message(
            &mut self.stream,
            &Message::FileHeader {
                name: name.to_string(),
                size,
            },
        )
        .await?;
        self.set_state(SessionState::FileInfoSent);

        self.set_state(SessionState::AwaitingReady);
        match self.recv().await? {
            Some(Message::Ready) => {}
            Some(other) => {
                return Err(ServerError::ProtocolViolation(format!(
                    "unexpected message in {:?}: {other:?}",
                    self.state
                )));
            }
            None => {
                self.events.on_log("Client not ready to receive");
                return Ok(());
            }
        }

        self.stream_file(name, &path, size).await
    }

    /// Streams the file contents in fixed-size chunks until EOF.
    async fn stream_file(
        &mut self,
        name: &str,
        path: &Path,
        size: u64,
    ) -> Result<(), ServerError> {
        self.set_state(SessionState::Streaming);
        self.events
            .on_log(&format!("Sending file: {name} to {}", self.peer));
        info!(peer = %self.peer, name, size, "streaming file");

        let mut file = tokio::fs::File::open(path).await?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut sent: u64 = 0;
        let mut chunks: u64 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(ServerError::Cancelled);
            }

            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }

            self.stream.write_all(&buf[..n]).await?;
            sent += n as u64;
            chunks += 1;

            if chunks % STATUS_CHUNK_INTERVAL == 0 {
                let percent = sent as f64 / size as f64 * 100.0;
                self.events
                    .on_status(&format!("Sending {name}: {percent:.1}%"));
            }
        }

        self.stream.flush().await?;
        self.events
            .on_log(&format!("File {name} sent successfully to {}", self.peer));
        info!(peer = %self.peer, name, sent, "file sent");
        Ok(())
    }

    /// Reads one control message, racing against session cancellation.
    async fn recv(&mut self) -> Result<Option<Message>, ServerError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ServerError::Cancelled),
            msg = read_message(&mut self.stream) => Ok(msg?),
        }
    }

    fn set_state(&mut self, next: SessionState) {
        self.state = next;
        debug!(peer = %self.peer, state = ?next, "session state");
    }
}

/// Resolves a requested name against the share directory.
///
/// The name must have the shape of a catalog entry: a bare file name with
/// no path separators or traversal components. Violations resolve to
/// `None`, indistinguishable from a missing file.
async fn resolve_request(share_dir: &Path, name: &str) -> Option<(PathBuf, u64)> {
    if !is_valid_request_name(name) {
        return None;
    }

    let path = share_dir.join(name);
    let metadata = tokio::fs::metadata(&path).await.ok()?;
    if !metadata.is_file() {
        return None;
    }
    Some((path, metadata.len()))
}

/// Rejects names that could resolve outside the share directory.
fn is_valid_request_name(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    if name.contains('/') || name.contains('\\') {
        return false;
    }
    // Windows drive-relative names like `C:report.pdf`.
    if name.len() >= 2 && name.as_bytes()[1] == b':' {
        return false;
    }
    true
}
