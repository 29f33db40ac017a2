use trickle_core::{ConnectionState, PeerConnectionState};

/// Notifications published to subscribers of a [`Connection`](crate::Connection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    TransportStateChanged(PeerConnectionState),
    ChannelOpen {
        label: String,
    },
    MessageReceived(String),
    /// The periodic sender ended. `error` is set when a send failed.
    MessageLoopStopped {
        error: Option<String>,
    },
    Failed {
        reason: String,
    },
}
