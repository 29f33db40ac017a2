use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use trickle_core::{ConnectionState, ModelError, PeerIdentity, SdpKind};

/// Broad classification used to decide what a failure does to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Inbound payload could not be decoded. Fails the targeted connection only.
    MalformedPayload,
    /// The peer connection reported a fatal negotiation error.
    TransportNegotiationFailure,
    /// An outbound signaling request failed.
    DeliveryFailure,
    /// Bad startup configuration. The only class allowed to stop the process.
    ConfigurationFailure,
    /// Request was well-formed but not valid in the current negotiation state.
    Protocol,
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] ModelError),

    #[error("transport negotiation failed: {0}")]
    TransportNegotiationFailure(String),

    #[error("signal delivery failed: {0}")]
    DeliveryFailure(String),

    #[error("invalid configuration: {0}")]
    ConfigurationFailure(String),

    #[error("{0} description already set for this connection")]
    DuplicateDescription(SdpKind),

    #[error("illegal state transition {from} -> {to}")]
    IllegalTransition {
        from: ConnectionState,
        to: ConnectionState,
    },

    #[error("no connection registered for peer {0}")]
    UnknownPeer(PeerIdentity),

    #[error("no connection registered for this listener")]
    NoConnection,

    #[error("connection is closed")]
    ConnectionClosed,

    #[error("more than {0} remote candidates arrived before the remote description")]
    TooManyEarlyCandidates(usize),
}

impl NegotiationError {
    pub fn transport(e: impl std::fmt::Display) -> Self {
        Self::TransportNegotiationFailure(e.to_string())
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MalformedPayload(_) => ErrorClass::MalformedPayload,
            Self::TransportNegotiationFailure(_) => ErrorClass::TransportNegotiationFailure,
            Self::DeliveryFailure(_) => ErrorClass::DeliveryFailure,
            Self::ConfigurationFailure(_) => ErrorClass::ConfigurationFailure,
            Self::DuplicateDescription(_)
            | Self::IllegalTransition { .. }
            | Self::UnknownPeer(_)
            | Self::NoConnection
            | Self::ConnectionClosed
            | Self::TooManyEarlyCandidates(_) => ErrorClass::Protocol,
        }
    }

    /// Whether this error moves the connection that produced it to `Failed`.
    pub fn fails_connection(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::MalformedPayload
                | ErrorClass::TransportNegotiationFailure
                | ErrorClass::DeliveryFailure
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedPayload(ModelError::UnknownSignalPath(_)) => StatusCode::NOT_FOUND,
            Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            Self::UnknownPeer(_) | Self::NoConnection => StatusCode::NOT_FOUND,
            Self::DuplicateDescription(_)
            | Self::IllegalTransition { .. }
            | Self::ConnectionClosed
            | Self::TooManyEarlyCandidates(_) => StatusCode::CONFLICT,
            Self::DeliveryFailure(_) => StatusCode::BAD_GATEWAY,
            Self::TransportNegotiationFailure(_) | Self::ConfigurationFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<reqwest::Error> for NegotiationError {
    fn from(e: reqwest::Error) -> Self {
        Self::DeliveryFailure(e.to_string())
    }
}

impl IntoResponse for NegotiationError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
