//! Service configuration.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use shareport_protocol::DEFAULT_PORT;

use crate::error::ServerError;

/// Catalog service configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind (all interfaces by default).
    pub bind_host: IpAddr,
    /// TCP port to listen on (0 = OS-assigned).
    pub port: u16,
    /// Directory whose regular files are advertised. Must already exist.
    pub share_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            share_dir: PathBuf::from("."),
        }
    }
}

/// Parses a textual port as presentation layers hand it over.
pub fn parse_port(input: &str) -> Result<u16, ServerError> {
    input
        .trim()
        .parse()
        .map_err(|_| ServerError::InvalidPort(input.to_string()))
}
