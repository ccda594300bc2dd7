//! Error types for the transfer client.

/// Errors produced by the transfer client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("already connected")]
    AlreadyConnected,

    #[error("not connected")]
    NotConnected,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("connection timed out")]
    ConnectionTimeout,

    #[error("invalid port: {0:?}")]
    InvalidPort(String),

    #[error("remote file not found: {0}")]
    RemoteFileNotFound(String),

    #[error("incomplete transfer: {received} of {total} bytes")]
    IncompleteTransfer { received: u64, total: u64 },

    #[error("cannot write destination file: {0}")]
    LocalIo(#[source] std::io::Error),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("wire error: {0}")]
    Wire(#[from] shareport_protocol::WireError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
