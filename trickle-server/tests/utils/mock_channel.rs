use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use trickle_server::{MessageChannel, NegotiationError};

/// In-memory data channel that forwards every sent message to a receiver.
pub struct MockChannel {
    label: String,
    tx: mpsc::UnboundedSender<String>,
    broken: AtomicBool,
}

impl MockChannel {
    pub fn new(label: &str) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = Arc::new(Self {
            label: label.to_owned(),
            tx,
            broken: AtomicBool::new(false),
        });
        (channel, rx)
    }

    /// Make every following send fail.
    pub fn break_channel(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageChannel for MockChannel {
    fn label(&self) -> String {
        self.label.clone()
    }

    async fn send_text(&self, text: String) -> Result<(), NegotiationError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(NegotiationError::transport("data channel is closed"));
        }
        self.tx
            .send(text)
            .map_err(|_| NegotiationError::transport("receiver dropped"))
    }
}
