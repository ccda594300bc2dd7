//! Transfer client: lists a remote catalog and downloads one file at a time.
//!
//! A [`TransferClient`] opens one TCP session per download: connect,
//! receive the catalog, request a file, stream it to the destination
//! directory. The protocol is strictly request/response over one socket,
//! so a session serves exactly one file and is consumed by the download.
//!
//! Presentation layers configure the client with [`ClientConfig`] and
//! observe it through the [`ClientEvents`] callbacks plus the per-download
//! progress closure.

mod client;
mod config;
mod error;
mod events;
mod state;

pub use client::TransferClient;
pub use config::{ClientConfig, parse_port};
pub use error::ClientError;
pub use events::ClientEvents;
pub use state::ClientState;
