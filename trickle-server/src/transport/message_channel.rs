use crate::error::NegotiationError;
use async_trait::async_trait;
use webrtc::data_channel::RTCDataChannel;

/// The open application-data conduit of a negotiated connection.
#[async_trait]
pub trait MessageChannel: Send + Sync + 'static {
    fn label(&self) -> String;

    async fn send_text(&self, text: String) -> Result<(), NegotiationError>;
}

#[async_trait]
impl MessageChannel for RTCDataChannel {
    fn label(&self) -> String {
        RTCDataChannel::label(self).to_owned()
    }

    async fn send_text(&self, text: String) -> Result<(), NegotiationError> {
        RTCDataChannel::send_text(self, text)
            .await
            .map(|_| ())
            .map_err(NegotiationError::transport)
    }
}
