use crate::error::NegotiationError;
use crate::transport::TransportEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use trickle_core::{Candidate, ConnectionId, ConnectionRole, SessionDescription};

/// The negotiation primitives the coordinator orchestrates.
///
/// Setting the local description starts candidate gathering; gathered
/// candidates and state changes are delivered through the event channel the
/// transport was created with.
#[async_trait]
pub trait PeerTransport: Send + Sync + 'static {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn set_local_description(&self, desc: &SessionDescription)
    -> Result<(), NegotiationError>;

    async fn set_remote_description(
        &self,
        desc: &SessionDescription,
    ) -> Result<(), NegotiationError>;

    async fn add_remote_candidate(&self, candidate: &Candidate) -> Result<(), NegotiationError>;

    async fn close(&self) -> Result<(), NegotiationError>;
}

/// Creates one transport per connection.
#[async_trait]
pub trait TransportFactory: Send + Sync + 'static {
    async fn create(
        &self,
        connection_id: ConnectionId,
        role: ConnectionRole,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>, NegotiationError>;
}
