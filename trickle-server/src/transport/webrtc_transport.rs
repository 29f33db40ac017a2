use crate::error::NegotiationError;
use crate::transport::{MessageChannel, PeerTransport, TransportConfig, TransportEvent, TransportFactory};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use trickle_core::{
    Candidate, ConnectionId, ConnectionRole, ModelError, PeerConnectionState, SessionDescription,
};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

/// A [`PeerTransport`] backed by a webrtc-rs peer connection with one data channel.
pub struct WebRtcTransport {
    connection_id: ConnectionId,
    peer_connection: Arc<RTCPeerConnection>,
}

impl WebRtcTransport {
    /// Build the peer connection and register its callbacks.
    /// The offerer creates the data channel; the answerer adopts the one the offerer announced.
    pub async fn new(
        connection_id: ConnectionId,
        role: ConnectionRole,
        config: &TransportConfig,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self, NegotiationError> {
        // Codecs are registered even though only the data channel is used.
        let mut m = MediaEngine::default();
        m.register_default_codecs()
            .map_err(NegotiationError::transport)?;
        let registry = register_default_interceptors(Registry::new(), &mut m)
            .map_err(NegotiationError::transport)?;

        let mut setting = SettingEngine::default();
        setting.set_include_loopback_candidate(config.include_loopback);

        let api = APIBuilder::new()
            .with_setting_engine(setting)
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let peer_connection = Arc::new(
            api.new_peer_connection(config.rtc_configuration())
                .await
                .map_err(NegotiationError::transport)?,
        );

        let state_tx = event_tx.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();

                Box::pin(async move {
                    info!("Peer connection {} state changed: {}", connection_id, s);
                    let _ = tx.send(TransportEvent::StateChanged(s.into())).await;
                })
            },
        ));

        let gathering_tx = event_tx.clone();
        peer_connection.on_ice_gathering_state_change(Box::new(move |s: RTCIceGathererState| {
            let tx = gathering_tx.clone();

            Box::pin(async move {
                debug!("ICE gathering state for {}: {}", connection_id, s);
                if s == RTCIceGathererState::Gathering {
                    let _ = tx
                        .send(TransportEvent::StateChanged(PeerConnectionState::Gathering))
                        .await;
                }
            })
        }));

        let ice_tx = event_tx.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c.and_then(|c| gathered_candidate(connection_id, &c)) else {
                    return;
                };
                let _ = tx.send(TransportEvent::CandidateGathered(candidate)).await;
            })
        }));

        match role {
            ConnectionRole::Offerer => {
                let dc = peer_connection
                    .create_data_channel(&config.data_channel_label, None)
                    .await
                    .map_err(NegotiationError::transport)?;
                wire_data_channel(connection_id, dc, event_tx);
            }
            ConnectionRole::Answerer => {
                peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
                    let tx = event_tx.clone();

                    Box::pin(async move {
                        debug!(
                            "New DataChannel '{}' announced for {}",
                            dc.label(),
                            connection_id
                        );
                        wire_data_channel(connection_id, dc, tx);
                    })
                }));
            }
        }

        Ok(Self {
            connection_id,
            peer_connection,
        })
    }
}

/// Convert a candidate reported by the ICE agent. Candidates that cannot be
/// expressed as a `candidate:` line are logged and dropped.
fn gathered_candidate(connection_id: ConnectionId, candidate: &RTCIceCandidate) -> Option<Candidate> {
    let line = match candidate.to_json() {
        Ok(init) => init.candidate,
        Err(e) => {
            warn!("Dropping gathered candidate of {}: {}", connection_id, e);
            return None;
        }
    };
    match Candidate::new(line) {
        Ok(candidate) => Some(candidate),
        Err(e) => {
            warn!("Dropping gathered candidate of {}: {}", connection_id, e);
            None
        }
    }
}

fn wire_data_channel(
    connection_id: ConnectionId,
    dc: Arc<RTCDataChannel>,
    event_tx: mpsc::Sender<TransportEvent>,
) {
    let dc_on_open = dc.clone();
    let tx_open = event_tx.clone();
    dc.on_open(Box::new(move || {
        let tx = tx_open.clone();
        let channel_ready: Arc<dyn MessageChannel> = dc_on_open.clone();

        Box::pin(async move {
            info!("DataChannel open and ready for {}", connection_id);
            let _ = tx.send(TransportEvent::ChannelOpen(channel_ready)).await;
        })
    }));

    let tx_msg = event_tx.clone();
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = tx_msg.clone();

        Box::pin(async move {
            let text = String::from_utf8_lossy(&msg.data).into_owned();
            let _ = tx.send(TransportEvent::Message(text)).await;
        })
    }));

    dc.on_close(Box::new(move || {
        let tx = event_tx.clone();

        Box::pin(async move {
            let _ = tx.send(TransportEvent::ChannelClosed).await;
        })
    }));
}

#[async_trait]
impl PeerTransport for WebRtcTransport {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(NegotiationError::transport)?;
        SessionDescription::try_from(offer).map_err(NegotiationError::transport)
    }

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(NegotiationError::transport)?;
        SessionDescription::try_from(answer).map_err(NegotiationError::transport)
    }

    async fn set_local_description(
        &self,
        desc: &SessionDescription,
    ) -> Result<(), NegotiationError> {
        let rtc = desc.to_rtc().map_err(NegotiationError::transport)?;
        self.peer_connection
            .set_local_description(rtc)
            .await
            .map_err(NegotiationError::transport)
    }

    async fn set_remote_description(
        &self,
        desc: &SessionDescription,
    ) -> Result<(), NegotiationError> {
        let rtc = desc
            .to_rtc()
            .map_err(|e| ModelError::MalformedDescription(e.to_string()))?;
        self.peer_connection
            .set_remote_description(rtc)
            .await
            .map_err(NegotiationError::transport)
    }

    async fn add_remote_candidate(&self, candidate: &Candidate) -> Result<(), NegotiationError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.as_str().to_owned(),
            ..Default::default()
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .map_err(|e| ModelError::MalformedCandidate(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), NegotiationError> {
        debug!("Closing peer connection {}", self.connection_id);
        self.peer_connection
            .close()
            .await
            .map_err(NegotiationError::transport)
    }
}

/// Creates a [`WebRtcTransport`] per connection from a shared [`TransportConfig`].
#[derive(Clone, Default)]
pub struct WebRtcTransportFactory {
    config: TransportConfig,
}

impl WebRtcTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn create(
        &self,
        connection_id: ConnectionId,
        role: ConnectionRole,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>, NegotiationError> {
        let transport = WebRtcTransport::new(connection_id, role, &self.config, events).await?;
        Ok(Arc::new(transport))
    }
}
