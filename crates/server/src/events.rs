//! Caller-facing event callbacks.
//!
//! The presentation layer implements [`ServerEvents`]; every method has a
//! no-op default so implementors only override what they render. Methods
//! are invoked from connection tasks, so implementations must be cheap or
//! hand off to their own channel.

use shareport_protocol::CatalogEntry;

/// Callbacks through which the catalog service reports to its caller.
pub trait ServerEvents: Send + Sync + 'static {
    /// A line for the caller's log view.
    fn on_log(&self, message: &str) {
        let _ = message;
    }

    /// A short status line (bind state, send progress).
    fn on_status(&self, message: &str) {
        let _ = message;
    }

    /// The share listing was recomputed via a refresh.
    fn on_catalog_updated(&self, entries: &[CatalogEntry]) {
        let _ = entries;
    }
}

/// No-op events for headless use.
impl ServerEvents for () {}
