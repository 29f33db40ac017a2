use crate::error::NegotiationError;
use bytes::Bytes;
use tokio::sync::oneshot;

pub type Reply = oneshot::Sender<Result<(), NegotiationError>>;

/// Requests handled by a connection's driver task, one at a time.
#[derive(Debug)]
pub enum ConnectionCommand {
    /// Offerer only: create the offer, apply it locally and send it.
    BeginOffer { reply: Reply },

    /// Body of an inbound `/sdp` request.
    RemoteDescription { body: Bytes, reply: Reply },

    /// Body of an inbound `/candidate` request.
    RemoteCandidate { body: Bytes, reply: Reply },

    /// The outbox could not deliver a signal.
    DeliveryFailed(NegotiationError),
}
