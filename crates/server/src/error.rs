//! Error types for the catalog service.

use std::path::PathBuf;

/// Errors produced by the catalog service.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("not a directory: {}", .0.display())]
    InvalidDirectory(PathBuf),

    #[error("invalid port: {0:?}")]
    InvalidPort(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire error: {0}")]
    Wire(#[from] shareport_protocol::WireError),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("cancelled")]
    Cancelled,
}
