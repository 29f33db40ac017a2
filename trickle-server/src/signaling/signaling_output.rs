use crate::error::NegotiationError;
use async_trait::async_trait;
use trickle_core::{Candidate, SessionDescription};

/// Delivers local negotiation material to the remote side of one connection.
#[async_trait]
pub trait SignalingOutput: Send + Sync + 'static {
    /// Send the local offer or answer.
    async fn send_description(&self, desc: &SessionDescription) -> Result<(), NegotiationError>;

    /// Send one local ICE candidate.
    async fn send_candidate(&self, candidate: &Candidate) -> Result<(), NegotiationError>;
}
