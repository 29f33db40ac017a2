use crate::ModelError;
use std::fmt;

/// One trickled ICE candidate, carried as the raw `candidate:...` line.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct Candidate(String);

impl Candidate {
    pub fn new(candidate: impl Into<String>) -> Result<Self, ModelError> {
        let candidate = candidate.into();
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            return Err(ModelError::MalformedCandidate("empty candidate".to_owned()));
        }
        if trimmed.contains(|c: char| c == '\r' || c == '\n') {
            return Err(ModelError::MalformedCandidate(
                "candidate spans multiple lines".to_owned(),
            ));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Decode a request body holding a single candidate line.
    pub fn decode(body: &[u8]) -> Result<Self, ModelError> {
        let text = std::str::from_utf8(body)
            .map_err(|e| ModelError::MalformedCandidate(e.to_string()))?;
        Self::new(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
