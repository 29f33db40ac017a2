use crate::config::DEFAULT_SEND_INTERVAL;
use crate::error::NegotiationError;
use crate::negotiation::candidate_buffer::{CandidateBuffer, Gathered};
use crate::negotiation::connection_command::{ConnectionCommand, Reply};
use crate::negotiation::{ConnectionEvent, spawn_message_loop};
use crate::signaling::{OutboundSignal, SignalingOutput, spawn_outbox};
use crate::transport::{PeerTransport, TransportEvent, TransportFactory};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use trickle_core::{
    Candidate, ConnectionId, ConnectionRole, ConnectionState, PeerIdentity, SdpKind,
    SessionDescription,
};

/// Supplies the text sent on every message-loop tick.
pub type MessageProducer = Arc<dyn Fn() -> String + Send + Sync>;

const TRANSPORT_EVENT_CAPACITY: usize = 256;
const COMMAND_CAPACITY: usize = 64;
const NOTIFICATION_CAPACITY: usize = 128;
/// Remote candidates held while the remote description is still unknown.
pub const EARLY_CANDIDATE_LIMIT: usize = 64;

/// Everything a connection needs from its surroundings.
#[derive(Clone)]
pub struct ConnectionSetup {
    pub transports: Arc<dyn TransportFactory>,
    pub signaling: Arc<dyn SignalingOutput>,
    pub producer: MessageProducer,
    pub send_interval: Duration,
}

impl ConnectionSetup {
    pub fn new(
        transports: Arc<dyn TransportFactory>,
        signaling: Arc<dyn SignalingOutput>,
        producer: MessageProducer,
    ) -> Self {
        Self {
            transports,
            signaling,
            producer,
            send_interval: DEFAULT_SEND_INTERVAL,
        }
    }

    pub fn with_send_interval(mut self, send_interval: Duration) -> Self {
        self.send_interval = send_interval;
        self
    }
}

struct Shared {
    id: ConnectionId,
    role: ConnectionRole,
    peer: Option<PeerIdentity>,
    buffer: CandidateBuffer,
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<ConnectionEvent>,
    cancel: CancellationToken,
}

impl Shared {
    fn transition(&self, next: ConnectionState) -> bool {
        let mut from = None;
        self.state.send_if_modified(|current| {
            if current.can_transition_to(next) {
                from = Some(*current);
                *current = next;
                true
            } else {
                false
            }
        });

        match from {
            Some(from) => {
                info!(
                    "Connection {} ({}) state changed: {} -> {}",
                    self.id, self.role, from, next
                );
                let _ = self
                    .events
                    .send(ConnectionEvent::StateChanged { from, to: next });
                true
            }
            None => {
                debug!(
                    "Connection {} ignoring transition to {} from {}",
                    self.id,
                    next,
                    *self.state.borrow()
                );
                false
            }
        }
    }

    fn fail(&self, e: &NegotiationError) {
        error!("Connection {} ({}) failed: {}", self.id, self.role, e);
        if self.transition(ConnectionState::Failed) {
            let _ = self.events.send(ConnectionEvent::Failed {
                reason: e.to_string(),
            });
        }
        self.cancel.cancel();
    }
}

/// Handle to one offer/answer negotiation. Cheap to clone.
///
/// All state changes are made by a single driver task fed by inbound
/// signaling requests and transport events, so transitions are linearizable.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
    command_tx: mpsc::Sender<ConnectionCommand>,
}

impl Connection {
    /// Create an offerer for `peer`, apply the offer locally and queue it for delivery.
    pub async fn offerer(peer: PeerIdentity, setup: ConnectionSetup) -> Result<Self, NegotiationError> {
        let connection = Self::prepare(ConnectionRole::Offerer, Some(peer), setup).await?;
        connection.begin_offer().await?;
        Ok(connection)
    }

    /// Create an answerer waiting for an inbound offer.
    pub async fn answerer(setup: ConnectionSetup) -> Result<Self, NegotiationError> {
        Self::prepare(ConnectionRole::Answerer, None, setup).await
    }

    /// Create the transport and start the driver without signaling anything yet.
    /// An offerer prepared this way starts negotiating on [`Connection::begin_offer`].
    pub async fn prepare(
        role: ConnectionRole,
        peer: Option<PeerIdentity>,
        setup: ConnectionSetup,
    ) -> Result<Self, NegotiationError> {
        if role == ConnectionRole::Offerer && peer.is_none() {
            return Err(NegotiationError::ConfigurationFailure(
                "an offerer needs a peer identity".to_owned(),
            ));
        }

        let id = ConnectionId::new();
        let (transport_tx, transport_rx) = mpsc::channel(TRANSPORT_EVENT_CAPACITY);
        let transport = setup.transports.create(id, role, transport_tx).await?;

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (state, _) = watch::channel(ConnectionState::New);
        let (events, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        let cancel = CancellationToken::new();

        let shared = Arc::new(Shared {
            id,
            role,
            peer,
            buffer: CandidateBuffer::new(),
            state,
            events,
            cancel: cancel.clone(),
        });

        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        spawn_outbox(
            id,
            setup.signaling,
            outbox_rx,
            cancel.clone(),
            command_tx.downgrade(),
        );

        let driver = ConnectionDriver {
            shared: shared.clone(),
            transport,
            command_rx,
            transport_rx,
            outbox: outbox_tx,
            producer: setup.producer,
            send_interval: setup.send_interval,
            message_loop: None,
            early_candidates: Vec::new(),
        };
        tokio::spawn(driver.run());

        info!(
            "Created {} connection {} (peer {:?})",
            role,
            id,
            shared.peer.as_ref().map(PeerIdentity::as_str)
        );

        Ok(Self { shared, command_tx })
    }

    pub async fn begin_offer(&self) -> Result<(), NegotiationError> {
        self.request(|reply| ConnectionCommand::BeginOffer { reply })
            .await
    }

    /// Apply the body of an inbound `/sdp` request.
    pub async fn accept_remote_description(&self, body: Bytes) -> Result<(), NegotiationError> {
        self.request(|reply| ConnectionCommand::RemoteDescription { body, reply })
            .await
    }

    /// Apply the body of an inbound `/candidate` request.
    pub async fn accept_remote_candidate(&self, body: Bytes) -> Result<(), NegotiationError> {
        self.request(|reply| ConnectionCommand::RemoteCandidate { body, reply })
            .await
    }

    async fn request(
        &self,
        make: impl FnOnce(Reply) -> ConnectionCommand,
    ) -> Result<(), NegotiationError> {
        let (reply, response) = oneshot::channel();
        self.command_tx
            .send(make(reply))
            .await
            .map_err(|_| NegotiationError::ConnectionClosed)?;
        response
            .await
            .map_err(|_| NegotiationError::ConnectionClosed)?
    }

    pub fn id(&self) -> ConnectionId {
        self.shared.id
    }

    pub fn role(&self) -> ConnectionRole {
        self.shared.role
    }

    pub fn peer(&self) -> Option<&PeerIdentity> {
        self.shared.peer.as_ref()
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.shared.events.subscribe()
    }

    /// Wait until the connection reaches `target`. Returns `false` on timeout.
    pub async fn wait_for_state(&self, target: ConnectionState, timeout: Duration) -> bool {
        let mut rx = self.watch_state();
        tokio::time::timeout(timeout, rx.wait_for(|s| *s == target))
            .await
            .is_ok_and(|reached| reached.is_ok())
    }

    pub fn local_description(&self) -> Option<SessionDescription> {
        self.shared.buffer.local_description()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.shared.buffer.remote_description()
    }

    /// Local candidates still waiting for the remote description.
    pub fn pending_candidates(&self) -> Vec<Candidate> {
        self.shared.buffer.pending()
    }

    /// Tear the connection down and wait for the driver to finish.
    /// A connection that already failed stays `Failed`.
    pub async fn close(&self) {
        self.shared.cancel.cancel();
        let mut rx = self.watch_state();
        let _ = rx.wait_for(|s| s.is_terminal()).await;
    }

    pub fn is_closed(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }
}

struct ConnectionDriver {
    shared: Arc<Shared>,
    transport: Arc<dyn PeerTransport>,
    command_rx: mpsc::Receiver<ConnectionCommand>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    outbox: mpsc::UnboundedSender<OutboundSignal>,
    producer: MessageProducer,
    send_interval: Duration,
    message_loop: Option<(CancellationToken, JoinHandle<()>)>,
    /// Remote candidates that arrived before the remote description.
    early_candidates: Vec<Candidate>,
}

impl ConnectionDriver {
    async fn run(mut self) {
        debug!("Connection {} driver started", self.shared.id);

        loop {
            tokio::select! {
                biased;

                _ = self.shared.cancel.cancelled() => break,

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("All handles to connection {} dropped", self.shared.id);
                            break;
                        }
                    }
                }

                evt = self.transport_rx.recv() => {
                    match evt {
                        Some(e) => self.handle_transport_event(e),
                        None => {
                            warn!("Transport channel of {} closed unexpectedly", self.shared.id);
                            break;
                        }
                    }
                }
            }
        }

        self.teardown().await;
    }

    async fn handle_command(&mut self, cmd: ConnectionCommand) {
        match cmd {
            ConnectionCommand::BeginOffer { reply } => {
                let result = self.begin_offer().await;
                self.settle(result, reply);
            }
            ConnectionCommand::RemoteDescription { body, reply } => {
                let result = self.on_remote_description(body).await;
                self.settle(result, reply);
            }
            ConnectionCommand::RemoteCandidate { body, reply } => {
                let result = self.on_remote_candidate(body).await;
                self.settle(result, reply);
            }
            ConnectionCommand::DeliveryFailed(e) => self.shared.fail(&e),
        }
    }

    /// Fail the connection if the error calls for it, then answer the requester.
    fn settle(&self, result: Result<(), NegotiationError>, reply: Reply) {
        if let Err(e) = &result {
            if e.fails_connection() {
                self.shared.fail(e);
            } else {
                warn!("Connection {} rejected request: {}", self.shared.id, e);
            }
        }
        let _ = reply.send(result);
    }

    fn current_state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    async fn begin_offer(&mut self) -> Result<(), NegotiationError> {
        if self.shared.role != ConnectionRole::Offerer {
            return Err(NegotiationError::IllegalTransition {
                from: self.current_state(),
                to: ConnectionState::LocalDescriptionSet,
            });
        }
        if self.shared.buffer.local_description().is_some() {
            return Err(NegotiationError::DuplicateDescription(SdpKind::Offer));
        }

        let offer = self.transport.create_offer().await?;
        // Gathering starts here; candidates queue up as transport events.
        self.transport.set_local_description(&offer).await?;
        let drained = self.shared.buffer.on_local_description_set(offer.clone())?;
        self.shared.transition(ConnectionState::LocalDescriptionSet);

        self.send_signal(OutboundSignal::Description(offer))?;
        self.transmit(drained).await
    }

    async fn on_remote_description(&mut self, body: Bytes) -> Result<(), NegotiationError> {
        let expected = match self.shared.role {
            ConnectionRole::Offerer => SdpKind::Answer,
            ConnectionRole::Answerer => SdpKind::Offer,
        };
        let desc = SessionDescription::decode_expecting(&body, expected)?;
        self.shared.buffer.check_remote_vacant(expected)?;

        if self.shared.role == ConnectionRole::Offerer
            && self.shared.buffer.local_description().is_none()
        {
            return Err(NegotiationError::IllegalTransition {
                from: self.current_state(),
                to: ConnectionState::RemoteDescriptionSet,
            });
        }

        self.transport.set_remote_description(&desc).await?;
        let drained = self.shared.buffer.on_remote_description_set(desc)?;
        self.shared.transition(ConnectionState::RemoteDescriptionSet);
        self.transmit(drained).await?;
        self.apply_early_candidates().await?;

        if self.shared.role == ConnectionRole::Answerer {
            let answer = self.transport.create_answer().await?;
            self.send_signal(OutboundSignal::Description(answer.clone()))?;
            // Only now does the answerer start gathering.
            self.transport.set_local_description(&answer).await?;
            let drained = self.shared.buffer.on_local_description_set(answer)?;
            self.transmit(drained).await?;
        }

        Ok(())
    }

    async fn on_remote_candidate(&mut self, body: Bytes) -> Result<(), NegotiationError> {
        let candidate = Candidate::decode(&body)?;
        if !self.shared.buffer.remote_description_known() {
            debug!(
                "Holding remote candidate for {} until the remote description arrives",
                self.shared.id
            );
            if self.early_candidates.len() >= EARLY_CANDIDATE_LIMIT {
                warn!(
                    "Rejecting remote candidate for {}: {} already held without a remote description",
                    self.shared.id,
                    self.early_candidates.len()
                );
                return Err(NegotiationError::TooManyEarlyCandidates(EARLY_CANDIDATE_LIMIT));
            }
            self.early_candidates.push(candidate);
            return Ok(());
        }
        debug!("Adding remote ICE candidate for {}", self.shared.id);
        self.transport.add_remote_candidate(&candidate).await
    }

    async fn apply_early_candidates(&mut self) -> Result<(), NegotiationError> {
        for candidate in std::mem::take(&mut self.early_candidates) {
            self.transport.add_remote_candidate(&candidate).await?;
        }
        Ok(())
    }

    fn send_signal(&self, signal: OutboundSignal) -> Result<(), NegotiationError> {
        self.outbox
            .send(signal)
            .map_err(|_| NegotiationError::ConnectionClosed)
    }

    async fn transmit(&self, drained: Vec<Candidate>) -> Result<(), NegotiationError> {
        if drained.is_empty() {
            return Ok(());
        }
        let outbox = self.outbox.clone();
        let sent = self
            .shared
            .buffer
            .flush_and_transmit(drained, |candidate| {
                let result = outbox
                    .send(OutboundSignal::Candidate(candidate))
                    .map_err(|_| NegotiationError::ConnectionClosed);
                async move { result }
            })
            .await?;
        debug!("Flushed {} buffered candidates for {}", sent, self.shared.id);
        Ok(())
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::CandidateGathered(candidate) => {
                match self.shared.buffer.on_local_candidate_gathered(candidate) {
                    Gathered::Transmit(candidate) => {
                        if self.send_signal(OutboundSignal::Candidate(candidate)).is_err() {
                            debug!("Outbox of {} is gone, candidate dropped", self.shared.id);
                        }
                    }
                    Gathered::Buffered => debug!(
                        "Buffered local candidate for {} ({} pending)",
                        self.shared.id,
                        self.shared.buffer.pending().len()
                    ),
                    Gathered::Discarded => {}
                }
            }

            TransportEvent::StateChanged(peer_state) => {
                let _ = self
                    .shared
                    .events
                    .send(ConnectionEvent::TransportStateChanged(peer_state));

                match ConnectionState::observed(peer_state) {
                    Some(ConnectionState::Failed) => {
                        self.shared
                            .fail(&NegotiationError::transport("peer connection failed"));
                    }
                    Some(ConnectionState::Closed) => {
                        info!("Transport of {} closed", self.shared.id);
                        self.shared.cancel.cancel();
                    }
                    Some(next) => {
                        self.shared.transition(next);
                    }
                    None => {}
                }
            }

            TransportEvent::ChannelOpen(channel) => {
                let label = channel.label();
                info!("Data channel '{}' open for {}", label, self.shared.id);
                let _ = self
                    .shared
                    .events
                    .send(ConnectionEvent::ChannelOpen { label });

                self.stop_message_loop();
                let token = self.shared.cancel.child_token();
                let handle = spawn_message_loop(
                    channel,
                    self.producer.clone(),
                    self.send_interval,
                    token.clone(),
                    self.shared.events.clone(),
                );
                self.message_loop = Some((token, handle));
            }

            TransportEvent::Message(text) => {
                info!("Message from data channel of {}: '{}'", self.shared.id, text);
                let _ = self
                    .shared
                    .events
                    .send(ConnectionEvent::MessageReceived(text));
            }

            TransportEvent::ChannelClosed => {
                info!("Data channel of {} closed", self.shared.id);
                self.stop_message_loop();
            }
        }
    }

    fn stop_message_loop(&mut self) {
        let Some((token, _handle)) = self.message_loop.take() else {
            return;
        };
        token.cancel();
    }

    async fn teardown(mut self) {
        self.shared.cancel.cancel();
        self.stop_message_loop();

        let dropped = self.shared.buffer.close();
        if dropped > 0 {
            debug!("Dropped {} unsent candidates of {}", dropped, self.shared.id);
        }

        if let Err(e) = self.transport.close().await {
            warn!("Failed to close transport of {}: {}", self.shared.id, e);
        }

        if !self.current_state().is_terminal() {
            self.shared.transition(ConnectionState::Closed);
        }
        info!("Connection {} finished", self.shared.id);
    }
}
