use serde::{Deserialize, Serialize};
use std::fmt;

/// State reported by the underlying peer connection.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
pub enum PeerConnectionState {
    New,
    Gathering,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[cfg(not(target_arch = "wasm32"))]
impl From<webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState>
    for PeerConnectionState
{
    fn from(s: webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState) -> Self {
        use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState as Rtc;
        match s {
            Rtc::Unspecified | Rtc::New => Self::New,
            Rtc::Connecting => Self::Connecting,
            Rtc::Connected => Self::Connected,
            Rtc::Disconnected => Self::Disconnected,
            Rtc::Failed => Self::Failed,
            Rtc::Closed => Self::Closed,
        }
    }
}

/// Negotiation progress of one connection as tracked by its coordinator.
///
/// Progress is monotonic. The only backward edge is `Disconnected -> Connected`
/// after a network flap. `Failed` and `Closed` are terminal, except that a
/// failed connection may still be closed.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
pub enum ConnectionState {
    New,
    /// Offerer only: offer applied locally, answer not yet received.
    LocalDescriptionSet,
    /// Remote description applied. The answerer stays here after applying its answer.
    RemoteDescriptionSet,
    Negotiating,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectionState {
    fn rank(self) -> u8 {
        match self {
            Self::New => 0,
            Self::LocalDescriptionSet => 1,
            Self::RemoteDescriptionSet => 2,
            Self::Negotiating => 3,
            Self::Connected => 4,
            Self::Disconnected => 5,
            Self::Failed => 6,
            Self::Closed => 7,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Closed, _) => false,
            (Self::Failed, next) => next == Self::Closed,
            (_, Self::Failed | Self::Closed) => true,
            (Self::Disconnected, Self::Connected) => true,
            (current, next) => next.rank() > current.rank(),
        }
    }

    /// Coordinator state implied by a transport observation, if any.
    pub fn observed(peer_state: PeerConnectionState) -> Option<Self> {
        match peer_state {
            PeerConnectionState::New | PeerConnectionState::Gathering => None,
            PeerConnectionState::Connecting => Some(Self::Negotiating),
            PeerConnectionState::Connected => Some(Self::Connected),
            PeerConnectionState::Disconnected => Some(Self::Disconnected),
            PeerConnectionState::Failed => Some(Self::Failed),
            PeerConnectionState::Closed => Some(Self::Closed),
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
