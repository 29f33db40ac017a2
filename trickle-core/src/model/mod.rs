mod candidate;
mod description;
mod peer;
mod role;
mod signal_path;
mod state;

pub use candidate::Candidate;
pub use description::{SdpKind, SessionDescription};
pub use peer::{ConnectionId, PeerIdentity};
pub use role::ConnectionRole;
pub use signal_path::{SignalEndpoint, SignalPath};
pub use state::{ConnectionState, PeerConnectionState};
