use crate::model::SdpKind;
use thiserror::Error;

/// Decode and validation failures for signaling payloads and identifiers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("peer identity must not be empty")]
    EmptyPeerIdentity,

    #[error("peer identity {0:?} contains characters not allowed in a path segment")]
    InvalidPeerIdentity(String),

    #[error("malformed session description: {0}")]
    MalformedDescription(String),

    #[error("expected {expected} description, got {found}")]
    UnexpectedDescriptionKind { expected: SdpKind, found: SdpKind },

    #[error("unsupported description type {0:?}")]
    UnsupportedDescriptionKind(String),

    #[error("malformed candidate: {0}")]
    MalformedCandidate(String),

    #[error("unknown signaling path {0:?}")]
    UnknownSignalPath(String),
}
