use crate::transport::MessageChannel;
use std::sync::Arc;
use trickle_core::{Candidate, PeerConnectionState};

/// Events a transport reports to the coordinator driving its connection.
pub enum TransportEvent {
    /// A local candidate was gathered and must be trickled to the remote peer.
    CandidateGathered(Candidate),

    StateChanged(PeerConnectionState),

    /// The data channel is open and ready for writes.
    ChannelOpen(Arc<dyn MessageChannel>),

    /// A text message arrived on the data channel.
    Message(String),

    ChannelClosed,
}
