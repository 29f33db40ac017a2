mod config;
mod error;
mod negotiation;
mod signaling;
mod transport;

pub use config::*;
pub use error::*;
pub use negotiation::*;
pub use signaling::*;
pub use transport::*;

pub use trickle_core::{
    Candidate, ConnectionId, ConnectionRole, ConnectionState, PeerConnectionState, PeerIdentity,
    SdpKind, SessionDescription,
};
