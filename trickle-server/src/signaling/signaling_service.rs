use crate::error::NegotiationError;
use crate::negotiation::{Connection, ConnectionSetup};
use crate::signaling::handle_signal;
use axum::Router;
use axum::routing::post;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use trickle_core::{ConnectionRole, PeerIdentity, SignalPath};

/// How long in-flight requests may finish once a TLS listener is asked to stop.
const TLS_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

struct SignalingInner {
    role: ConnectionRole,
    /// Keyed by the identity in the inbound path; `None` for the unscoped routes.
    connections: DashMap<Option<PeerIdentity>, Connection>,
}

/// Routes inbound signaling requests of one listener to their connections.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(role: ConnectionRole) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                role,
                connections: DashMap::new(),
            }),
        }
    }

    pub fn role(&self) -> ConnectionRole {
        self.inner.role
    }

    /// Make `connection` reachable through its routes. A closed connection under the
    /// same key is replaced; a live one is not.
    pub fn register(&self, connection: Connection) -> Result<(), NegotiationError> {
        let key = connection.peer().cloned();
        match self.inner.connections.entry(key) {
            Entry::Occupied(mut existing) => {
                if !existing.get().is_closed() {
                    return Err(NegotiationError::ConfigurationFailure(format!(
                        "a live connection is already registered for {}",
                        describe(existing.key())
                    )));
                }
                existing.insert(connection);
            }
            Entry::Vacant(slot) => {
                info!(
                    "Registered {} connection {} for {}",
                    connection.role(),
                    connection.id(),
                    describe(slot.key())
                );
                slot.insert(connection);
            }
        }
        Ok(())
    }

    pub fn get(&self, peer: Option<&PeerIdentity>) -> Option<Connection> {
        self.inner
            .connections
            .get(&peer.cloned())
            .map(|c| c.value().clone())
    }

    pub(crate) fn route(&self, path: &SignalPath) -> Result<Connection, NegotiationError> {
        self.get(path.peer.as_ref()).ok_or_else(|| match &path.peer {
            Some(peer) => NegotiationError::UnknownPeer(peer.clone()),
            None => NegotiationError::NoConnection,
        })
    }

    /// Register an offerer for `peer` before its offer goes out, so the answer
    /// and candidates it triggers always find the connection.
    pub async fn open_offerer(
        &self,
        peer: PeerIdentity,
        setup: ConnectionSetup,
    ) -> Result<Connection, NegotiationError> {
        let connection = Connection::prepare(ConnectionRole::Offerer, Some(peer), setup).await?;
        self.register(connection.clone())?;
        connection.begin_offer().await?;
        Ok(connection)
    }

    pub async fn open_answerer(&self, setup: ConnectionSetup) -> Result<Connection, NegotiationError> {
        let connection = Connection::answerer(setup).await?;
        self.register(connection.clone())?;
        Ok(connection)
    }

    pub fn connections(&self) -> Vec<Connection> {
        self.inner
            .connections
            .iter()
            .map(|c| c.value().clone())
            .collect()
    }

    pub async fn close_all(&self) {
        let connections = self.connections();
        join_all(connections.iter().map(Connection::close)).await;
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/{endpoint}", post(handle_signal))
            .with_state(self.clone())
    }
}

fn describe(peer: &Option<PeerIdentity>) -> String {
    match peer {
        Some(peer) => format!("peer {peer}"),
        None => "the unscoped routes".to_owned(),
    }
}

/// Serve `service` on `listener` until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    service: SignalingService,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("{} signaling listening on {}", service.role(), addr);
    }
    axum::serve(listener, service.router())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// Serve `service` over TLS on `listener` until `shutdown` fires.
pub async fn serve_tls(
    listener: TcpListener,
    service: SignalingService,
    tls: Arc<rustls::ServerConfig>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = listener.into_std()?;
    if let Ok(addr) = listener.local_addr() {
        info!("{} signaling listening on {} (TLS)", service.role(), addr);
    }

    let handle = Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            shutdown.cancelled().await;
            handle.graceful_shutdown(Some(TLS_SHUTDOWN_GRACE));
        }
    });

    axum_server::from_tcp_rustls(listener, RustlsConfig::from_config(tls))
        .handle(handle)
        .serve(service.router().into_make_service())
        .await
}
