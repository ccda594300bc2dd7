//! Wire protocol for Shareport catalog exchange and file transfers.
//!
//! One control connection carries the whole session: the server sends its
//! file catalog, the client requests a single file, the server answers with
//! a file header (or an error), and after the client's ready token the raw
//! file bytes follow unframed.
//!
//! # Wire format
//!
//! Every control message travels in a length-prefixed frame:
//!
//! ```text
//! FRAME: [4 bytes BE: payload length][payload]
//!
//! PAYLOAD: [1 byte: tag][fields...]
//!
//! CATALOG     (server -> client): [4 BE: count] then per entry
//!                                 [2 BE: name_len][name UTF-8][8 BE: size]
//! REQUEST     (client -> server): [2 BE: name_len][name UTF-8]
//! FILE_HEADER (server -> client): [2 BE: name_len][name UTF-8][8 BE: size]
//! ERROR       (server -> client): [2 BE: msg_len][message UTF-8]
//! READY       (client -> server): no fields
//! DISCONNECT  (client -> server): no fields
//! ```
//!
//! File data is not framed: after READY the server streams the announced
//! number of bytes in [`CHUNK_SIZE`] chunks and closes the socket. The
//! receiver's own byte count against the file header is the termination
//! signal.

pub mod frame;
pub mod message;
pub mod types;

pub use frame::{read_frame, write_frame};
pub use message::{Message, read_message, write_message};
pub use types::{CatalogEntry, TransferProgress, format_size};

use std::time::Duration;

/// Default TCP port for the catalog service.
pub const DEFAULT_PORT: u16 = 5001;

/// Chunk size for streaming file data.
pub const CHUNK_SIZE: usize = 4096;

/// Maximum control frame payload (64 KiB).
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Default timeout for the client's TCP connection attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors produced by the wire codec.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("frame of {0} bytes exceeds the {MAX_FRAME_SIZE} byte limit")]
    FrameTooLarge(usize),
}
