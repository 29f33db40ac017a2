use crate::error::NegotiationError;
use crate::signaling::SignalingService;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bytes::Bytes;
use tracing::{debug, warn};
use trickle_core::{SignalEndpoint, SignalPath};

/// `POST /{endpoint}` where the segment is `sdp`, `candidate`, or either suffixed by a peer identity.
pub async fn handle_signal(
    Path(segment): Path<String>,
    State(service): State<SignalingService>,
    body: Bytes,
) -> Result<StatusCode, NegotiationError> {
    let result = dispatch(&segment, &service, body).await;
    if let Err(e) = &result {
        warn!("Rejected POST /{}: {}", segment, e);
    }
    result.map(|_| StatusCode::OK)
}

async fn dispatch(
    segment: &str,
    service: &SignalingService,
    body: Bytes,
) -> Result<(), NegotiationError> {
    let path = SignalPath::parse(segment)?;
    let connection = service.route(&path)?;
    debug!("{} -> connection {} ({} bytes)", path, connection.id(), body.len());

    match path.endpoint {
        SignalEndpoint::Description => connection.accept_remote_description(body).await,
        SignalEndpoint::Candidate => connection.accept_remote_candidate(body).await,
    }
}
