use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use trickle_server::{Candidate, NegotiationError, SessionDescription, SignalingOutput};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalMessage {
    Description(SessionDescription),
    Candidate(Candidate),
}

/// Mock SignalingOutput that captures all outgoing signals.
#[derive(Clone)]
pub struct MockSignalingOutput {
    /// Channel to send captured signals.
    tx: mpsc::UnboundedSender<SignalMessage>,
    /// All captured signals (for verification).
    signals: Arc<Mutex<Vec<SignalMessage>>>,
    /// When set, every delivery fails.
    failing: Arc<AtomicBool>,
}

impl MockSignalingOutput {
    /// Create a new MockSignalingOutput and its receiver channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SignalMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let signaling = Self {
            tx,
            signals: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(AtomicBool::new(false)),
        };
        (signaling, rx)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every description delivered so far, in order.
    pub async fn descriptions(&self) -> Vec<SessionDescription> {
        self.signals
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                SignalMessage::Description(desc) => Some(desc.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every candidate delivered so far, in order.
    pub async fn candidates(&self) -> Vec<Candidate> {
        self.signals
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                SignalMessage::Candidate(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, msg: SignalMessage) -> Result<(), NegotiationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NegotiationError::DeliveryFailure(
                "mock signaling refused delivery".to_owned(),
            ));
        }
        self.signals.lock().await.push(msg.clone());
        let _ = self.tx.send(msg);
        Ok(())
    }
}

#[async_trait]
impl SignalingOutput for MockSignalingOutput {
    async fn send_description(&self, desc: &SessionDescription) -> Result<(), NegotiationError> {
        tracing::debug!("[MockSignaling] send_description {}", desc.kind);
        self.record(SignalMessage::Description(desc.clone())).await
    }

    async fn send_candidate(&self, candidate: &Candidate) -> Result<(), NegotiationError> {
        tracing::debug!("[MockSignaling] send_candidate {}", candidate);
        self.record(SignalMessage::Candidate(candidate.clone())).await
    }
}
