//! The transfer client and its download state machine.

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use shareport_protocol::{
    CHUNK_SIZE, CatalogEntry, Message, TransferProgress, format_size, read_message, write_message,
};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::events::ClientEvents;
use crate::state::ClientState;

/// Client side of a catalog session.
///
/// At most one download is outstanding per client (`download` takes
/// `&mut self`); the protocol is strictly request/response over one
/// socket, and the server serves one file per connection.
pub struct TransferClient<E: ClientEvents> {
    config: ClientConfig,
    events: Arc<E>,
    stream: Option<TcpStream>,
    catalog: Vec<CatalogEntry>,
    state: ClientState,
}

impl<E: ClientEvents> TransferClient<E> {
    pub fn new(config: ClientConfig, events: E) -> Self {
        Self {
            config,
            events: Arc::new(events),
            stream: None,
            catalog: Vec::new(),
            state: ClientState::Disconnected,
        }
    }

    /// Current session phase.
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Last received catalog snapshot.
    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Connects to the server and receives the catalog.
    ///
    /// An empty catalog is terminal: there is nothing to request, so the
    /// caller is informed, the connection closes without any further
    /// message, and the empty list is returned.
    pub async fn connect(&mut self) -> Result<Vec<CatalogEntry>, ClientError> {
        if self.stream.is_some() {
            return Err(ClientError::AlreadyConnected);
        }

        self.set_state(ClientState::Connecting);
        self.events.on_status(&format!(
            "Connecting to {}:{}...",
            self.config.host, self.config.port
        ));

        let connect = TcpStream::connect((self.config.host.as_str(), self.config.port));
        let mut stream = match tokio::time::timeout(self.config.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                self.events.on_log("Connection refused by server");
                self.set_state(ClientState::Disconnected);
                return Err(ClientError::ConnectionRefused);
            }
            Ok(Err(e)) => {
                self.events.on_log(&format!("Error connecting: {e}"));
                self.set_state(ClientState::Disconnected);
                return Err(e.into());
            }
            Err(_) => {
                self.events.on_log("Connection timed out");
                self.set_state(ClientState::Disconnected);
                return Err(ClientError::ConnectionTimeout);
            }
        };

        let catalog = match read_message(&mut stream).await {
            Ok(Some(Message::Catalog(entries))) => entries,
            Ok(Some(other)) => {
                self.set_state(ClientState::Failed);
                return Err(ClientError::ProtocolViolation(format!(
                    "expected catalog, got {other:?}"
                )));
            }
            Ok(None) => {
                self.set_state(ClientState::Failed);
                return Err(ClientError::ProtocolViolation(
                    "connection closed before catalog".into(),
                ));
            }
            Err(e) => {
                self.events.on_log(&format!("Error receiving catalog: {e}"));
                self.set_state(ClientState::Failed);
                return Err(e.into());
            }
        };

        info!(
            host = %self.config.host,
            port = self.config.port,
            files = catalog.len(),
            "connected"
        );
        self.events.on_log(&format!(
            "Connected to server at {}:{}",
            self.config.host, self.config.port
        ));
        self.events.on_catalog_updated(&catalog);
        self.catalog = catalog.clone();

        if catalog.is_empty() {
            self.events.on_log("No files available on the server");
            self.events.on_status("No files available");
            self.set_state(ClientState::Closed);
            return Ok(catalog);
        }

        self.events
            .on_status(&format!("{} files available", catalog.len()));
        self.stream = Some(stream);
        self.set_state(ClientState::CatalogReceived);
        Ok(catalog)
    }

    /// Downloads `filename` into `dest_dir`, reporting progress per chunk.
    ///
    /// The destination directory is created if absent; an existing file
    /// of the same name is truncated. On an incomplete transfer the
    /// partial file is left on disk and the error carries the byte
    /// counts. The session is consumed whatever the outcome.
    pub async fn download(
        &mut self,
        filename: &str,
        dest_dir: &Path,
        mut on_progress: impl FnMut(TransferProgress),
    ) -> Result<TransferProgress, ClientError> {
        let mut stream = self.stream.take().ok_or(ClientError::NotConnected)?;

        let result = self
            .download_inner(&mut stream, filename, dest_dir, &mut on_progress)
            .await;

        // One file per connection; the server closes its end after the
        // last chunk either way.
        drop(stream);

        match &result {
            Ok(progress) => {
                self.events
                    .on_log(&format!("File {filename} downloaded successfully"));
                self.events.on_status(&format!(
                    "Downloaded {filename} ({})",
                    format_size(progress.total_bytes)
                ));
                self.set_state(ClientState::Complete);
                self.set_state(ClientState::Closed);
            }
            Err(e) => {
                self.events
                    .on_log(&format!("Error downloading {filename}: {e}"));
                self.set_state(ClientState::Failed);
            }
        }
        result
    }

    async fn download_inner(
        &mut self,
        stream: &mut TcpStream,
        filename: &str,
        dest_dir: &Path,
        on_progress: &mut impl FnMut(TransferProgress),
    ) -> Result<TransferProgress, ClientError> {
        self.set_state(ClientState::Requesting);
        write_message(
            stream,
            &Message::Request {
                name: filename.to_string(),
            },
        )
        .await?;

        self.set_state(ClientState::AwaitingHeader);
        let (name, total) = match read_message(stream).await? {
            Some(Message::FileHeader { name, size }) => (name, size),
            Some(Message::Error { message }) => {
                return Err(ClientError::RemoteFileNotFound(message));
            }
            Some(other) => {
                return Err(ClientError::ProtocolViolation(format!(
                    "expected file header, got {other:?}"
                )));
            }
            None => {
                return Err(ClientError::ProtocolViolation(
                    "connection closed awaiting file header".into(),
                ));
            }
        };
        debug!(name, total, "file header received");

        self.set_state(ClientState::Ready);
        write_message(stream, &Message::Ready).await?;

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(ClientError::LocalIo)?;
        let dest_path = dest_dir.join(filename);
        let mut file = tokio::fs::File::create(&dest_path)
            .await
            .map_err(ClientError::LocalIo)?;

        self.set_state(ClientState::Streaming);
        self.events.on_status(&format!("Downloading {filename}..."));

        let mut progress = TransferProgress {
            bytes_received: 0,
            total_bytes: total,
        };
        let mut buf = vec![0u8; CHUNK_SIZE];

        while progress.bytes_received < total {
            let remaining = (total - progress.bytes_received).min(CHUNK_SIZE as u64) as usize;
            let n = stream.read(&mut buf[..remaining]).await?;
            if n == 0 {
                // Peer closed mid-stream; keep the partial file on disk.
                warn!(
                    received = progress.bytes_received,
                    total, "connection closed before transfer completed"
                );
                break;
            }

            file.write_all(&buf[..n]).await.map_err(ClientError::LocalIo)?;
            progress.bytes_received += n as u64;
            on_progress(progress);
        }

        file.flush().await.map_err(ClientError::LocalIo)?;

        if !progress.is_complete() {
            return Err(ClientError::IncompleteTransfer {
                received: progress.bytes_received,
                total,
            });
        }

        info!(name = filename, bytes = total, "download complete");
        Ok(progress)
    }

    /// Sends a best-effort disconnect and closes the connection.
    ///
    /// Send failures are ignored; the client ends up disconnected
    /// regardless.
    pub async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = write_message(&mut stream, &Message::Disconnect).await;
            let _ = stream.shutdown().await;
            self.events.on_log("Disconnected from server");
        }
        self.events.on_status("Disconnected");
        self.set_state(ClientState::Disconnected);
    }

    fn set_state(&mut self, next: ClientState) {
        if self.state != next {
            self.state = next;
            self.events.on_connection_state_changed(next);
        }
    }
}
