use crate::negotiation::ConnectionCommand;
use crate::signaling::SignalingOutput;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use trickle_core::{Candidate, ConnectionId, SessionDescription};

/// Material queued for delivery to the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundSignal {
    Description(SessionDescription),
    Candidate(Candidate),
}

/// Deliver queued signals one at a time, in queue order.
///
/// Nothing is sent once `cancel` fires. The first delivery failure is reported
/// back to the connection driver and stops the outbox.
pub(crate) fn spawn_outbox(
    id: ConnectionId,
    signaling: Arc<dyn SignalingOutput>,
    mut rx: mpsc::UnboundedReceiver<OutboundSignal>,
    cancel: CancellationToken,
    failures: mpsc::WeakSender<ConnectionCommand>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let signal = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                signal = rx.recv() => match signal {
                    Some(signal) => signal,
                    None => break,
                },
            };

            let delivery = async {
                match &signal {
                    OutboundSignal::Description(desc) => signaling.send_description(desc).await,
                    OutboundSignal::Candidate(candidate) => {
                        signaling.send_candidate(candidate).await
                    }
                }
            };

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = delivery => result,
            };

            if let Err(e) = result {
                error!("Failed to deliver signal for {}: {}", id, e);
                if let Some(tx) = failures.upgrade() {
                    let _ = tx.send(ConnectionCommand::DeliveryFailed(e)).await;
                }
                break;
            }
        }
        debug!("Outbox of {} stopped", id);
    })
}
