use crate::error::NegotiationError;
use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use trickle_core::{Candidate, PeerIdentity, SessionDescription, SignalPath};

/// Posts descriptions and candidates to a remote signaling listener.
///
/// An offerer talks to an answerer's unscoped `/sdp` and `/candidate` routes.
/// An answerer talks to the offerer's routes scoped by its own identity,
/// `/sdp{id}` and `/candidate{id}`.
#[derive(Debug, Clone)]
pub struct HttpSignalingClient {
    client: reqwest::Client,
    base_url: String,
    scope: Option<PeerIdentity>,
}

impl HttpSignalingClient {
    pub fn for_offerer(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            scope: None,
        }
    }

    pub fn for_answerer(
        client: reqwest::Client,
        base_url: impl Into<String>,
        identity: PeerIdentity,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            scope: Some(identity),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &SignalPath) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post(
        &self,
        path: SignalPath,
        content_type: &'static str,
        body: String,
    ) -> Result<(), NegotiationError> {
        let url = self.url(&path);
        debug!("POST {}", url);
        self.client
            .post(&url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl SignalingOutput for HttpSignalingClient {
    async fn send_description(&self, desc: &SessionDescription) -> Result<(), NegotiationError> {
        let body = desc.encode()?;
        self.post(
            SignalPath::description(self.scope.clone()),
            "application/json; charset=utf-8",
            body,
        )
        .await
    }

    async fn send_candidate(&self, candidate: &Candidate) -> Result<(), NegotiationError> {
        self.post(
            SignalPath::candidate(self.scope.clone()),
            "text/plain; charset=utf-8",
            candidate.as_str().to_owned(),
        )
        .await
    }
}
