//! Shared transfer data types.

use serde::{Deserialize, Serialize};

/// A file advertised in the share catalog.
///
/// Derived on demand from the share directory; a catalog snapshot may be
/// stale by the time a file is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Bare file name (no path components).
    pub name: String,
    /// Size in bytes at enumeration time.
    pub size: u64,
}

/// Byte-level progress of one file transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProgress {
    pub bytes_received: u64,
    pub total_bytes: u64,
}

impl TransferProgress {
    /// Completion as a percentage (100.0 for an empty file).
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        self.bytes_received as f64 / self.total_bytes as f64 * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_received == self.total_bytes
    }
}

/// Formats a byte count for display, e.g. `12.06 KB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} PB")
}
