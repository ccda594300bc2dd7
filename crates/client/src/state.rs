//! Client-side session states.

use serde::Serialize;

/// Phases of the client session, reported through
/// [`ClientEvents::on_connection_state_changed`](crate::ClientEvents::on_connection_state_changed).
///
/// `Complete`, `Failed` and `Closed` are resting states; the next
/// `connect` or `disconnect` call moves on from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientState {
    Disconnected,
    Connecting,
    CatalogReceived,
    Requesting,
    AwaitingHeader,
    Ready,
    Streaming,
    Complete,
    Failed,
    Closed,
}
