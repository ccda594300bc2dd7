//! Caller-facing event callbacks.
//!
//! The presentation layer implements [`ClientEvents`]; every method has a
//! no-op default so implementors only override what they render. Methods
//! are invoked from whatever task drives the client, so implementations
//! must be cheap or hand off to their own channel.

use shareport_protocol::CatalogEntry;

use crate::state::ClientState;

/// Callbacks through which the transfer client reports to its caller.
pub trait ClientEvents: Send + Sync + 'static {
    /// A line for the caller's log view.
    fn on_log(&self, message: &str) {
        let _ = message;
    }

    /// A short status line (connect progress, download progress).
    fn on_status(&self, message: &str) {
        let _ = message;
    }

    /// The session moved to a new phase.
    fn on_connection_state_changed(&self, state: ClientState) {
        let _ = state;
    }

    /// A catalog snapshot arrived from the server.
    fn on_catalog_updated(&self, entries: &[CatalogEntry]) {
        let _ = entries;
    }
}

/// No-op events for headless use.
impl ClientEvents for () {}
