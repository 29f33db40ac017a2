use crate::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

impl fmt::Display for SdpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offer => f.write_str("offer"),
            Self::Answer => f.write_str("answer"),
        }
    }
}

/// An SDP offer or answer. Encoded on the wire as `{"type": "offer", "sdp": "..."}`.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }

    pub fn encode(&self) -> Result<String, ModelError> {
        serde_json::to_string(self).map_err(|e| ModelError::MalformedDescription(e.to_string()))
    }

    pub fn decode(body: &[u8]) -> Result<Self, ModelError> {
        let desc: Self = serde_json::from_slice(body)
            .map_err(|e| ModelError::MalformedDescription(e.to_string()))?;
        if desc.sdp.trim().is_empty() {
            return Err(ModelError::MalformedDescription("empty sdp".to_owned()));
        }
        Ok(desc)
    }

    /// Decode and require a particular kind; an answerer only accepts offers and vice versa.
    pub fn decode_expecting(body: &[u8], expected: SdpKind) -> Result<Self, ModelError> {
        let desc = Self::decode(body)?;
        if desc.kind != expected {
            return Err(ModelError::UnexpectedDescriptionKind {
                expected,
                found: desc.kind,
            });
        }
        Ok(desc)
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod rtc {
    use super::{SdpKind, SessionDescription};
    use crate::ModelError;
    use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
    use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

    impl SessionDescription {
        /// Parse into the webrtc representation. Fails when the SDP blob does not parse.
        pub fn to_rtc(&self) -> Result<RTCSessionDescription, webrtc::Error> {
            match self.kind {
                SdpKind::Offer => RTCSessionDescription::offer(self.sdp.clone()),
                SdpKind::Answer => RTCSessionDescription::answer(self.sdp.clone()),
            }
        }
    }

    impl TryFrom<RTCSessionDescription> for SessionDescription {
        type Error = ModelError;

        fn try_from(desc: RTCSessionDescription) -> Result<Self, Self::Error> {
            match desc.sdp_type {
                RTCSdpType::Offer => Ok(Self::offer(desc.sdp)),
                RTCSdpType::Answer => Ok(Self::answer(desc.sdp)),
                other => Err(ModelError::UnsupportedDescriptionKind(other.to_string())),
            }
        }
    }
}
