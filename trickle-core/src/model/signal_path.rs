use crate::ModelError;
use crate::model::PeerIdentity;
use std::fmt;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum SignalEndpoint {
    Description,
    Candidate,
}

impl SignalEndpoint {
    fn prefix(self) -> &'static str {
        match self {
            Self::Description => "sdp",
            Self::Candidate => "candidate",
        }
    }
}

/// A signaling route: `/sdp`, `/candidate`, or their peer-scoped forms
/// `/sdp{id}` and `/candidate{id}` served by an offerer talking to several answerers.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct SignalPath {
    pub endpoint: SignalEndpoint,
    pub peer: Option<PeerIdentity>,
}

impl SignalPath {
    pub fn description(peer: Option<PeerIdentity>) -> Self {
        Self {
            endpoint: SignalEndpoint::Description,
            peer,
        }
    }

    pub fn candidate(peer: Option<PeerIdentity>) -> Self {
        Self {
            endpoint: SignalEndpoint::Candidate,
            peer,
        }
    }

    /// Parse a single path segment (without the leading slash).
    pub fn parse(segment: &str) -> Result<Self, ModelError> {
        let segment = segment.trim_start_matches('/');
        for endpoint in [SignalEndpoint::Candidate, SignalEndpoint::Description] {
            let Some(rest) = segment.strip_prefix(endpoint.prefix()) else {
                continue;
            };
            let peer = if rest.is_empty() {
                None
            } else {
                Some(
                    PeerIdentity::new(rest)
                        .map_err(|_| ModelError::UnknownSignalPath(segment.to_owned()))?,
                )
            };
            return Ok(Self { endpoint, peer });
        }
        Err(ModelError::UnknownSignalPath(segment.to_owned()))
    }
}

impl fmt::Display for SignalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.endpoint.prefix())?;
        if let Some(peer) = &self.peer {
            write!(f, "{peer}")?;
        }
        Ok(())
    }
}
