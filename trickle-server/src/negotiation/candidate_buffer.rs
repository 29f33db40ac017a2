use crate::error::NegotiationError;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use trickle_core::{Candidate, SdpKind, SessionDescription};

#[derive(Debug, Default)]
struct BufferState {
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
    pending: VecDeque<Candidate>,
    closed: bool,
}

impl BufferState {
    fn ready(&self) -> bool {
        self.local.is_some() && self.remote.is_some()
    }
}

/// What to do with a freshly gathered local candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gathered {
    /// Both descriptions are known: send it now.
    Transmit(Candidate),
    /// Held until the remote description arrives.
    Buffered,
    /// The connection is closed; the candidate is dropped.
    Discarded,
}

/// Per-connection queue of local candidates plus the description slots.
///
/// The queue, the local/remote descriptions and the closed flag sit behind
/// one lock so that "is the remote description known" and "append to the
/// queue" happen atomically. The lock is never held across I/O: callers get
/// back the candidates to send and transmit them after the guard is dropped.
#[derive(Debug, Default)]
pub struct CandidateBuffer {
    state: Mutex<BufferState>,
}

impl CandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn on_local_candidate_gathered(&self, candidate: Candidate) -> Gathered {
        let mut state = self.lock();
        if state.closed {
            return Gathered::Discarded;
        }
        if state.ready() {
            return Gathered::Transmit(candidate);
        }
        debug!("Buffering candidate until remote description is known");
        state.pending.push_back(candidate);
        Gathered::Buffered
    }

    /// Record the local description. Returns candidates that became sendable.
    pub fn on_local_description_set(
        &self,
        desc: SessionDescription,
    ) -> Result<Vec<Candidate>, NegotiationError> {
        let mut state = self.lock();
        if state.closed {
            return Err(NegotiationError::ConnectionClosed);
        }
        if state.local.is_some() {
            return Err(NegotiationError::DuplicateDescription(desc.kind));
        }
        state.local = Some(desc);
        Ok(Self::drain_if_ready(&mut state))
    }

    /// Record the remote description and drain everything buffered so far, in gather order.
    pub fn on_remote_description_set(
        &self,
        desc: SessionDescription,
    ) -> Result<Vec<Candidate>, NegotiationError> {
        let mut state = self.lock();
        if state.closed {
            return Err(NegotiationError::ConnectionClosed);
        }
        if state.remote.is_some() {
            return Err(NegotiationError::DuplicateDescription(desc.kind));
        }
        state.remote = Some(desc);
        Ok(Self::drain_if_ready(&mut state))
    }

    fn drain_if_ready(state: &mut BufferState) -> Vec<Candidate> {
        if state.ready() {
            state.pending.drain(..).collect()
        } else {
            Vec::new()
        }
    }

    /// Send `drained` in order, stopping as soon as the buffer is closed.
    /// Returns how many candidates were handed to `transmit`.
    pub async fn flush_and_transmit<F, Fut, E>(
        &self,
        drained: Vec<Candidate>,
        mut transmit: F,
    ) -> Result<usize, E>
    where
        F: FnMut(Candidate) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let mut sent = 0;
        for candidate in drained {
            if self.is_closed() {
                debug!("Buffer closed, dropping remaining candidates");
                break;
            }
            transmit(candidate).await?;
            sent += 1;
        }
        Ok(sent)
    }

    /// Reject an inbound description whose kind already has a slot filled.
    pub fn check_remote_vacant(&self, kind: SdpKind) -> Result<(), NegotiationError> {
        let state = self.lock();
        if state.closed {
            return Err(NegotiationError::ConnectionClosed);
        }
        if state.remote.is_some() {
            return Err(NegotiationError::DuplicateDescription(kind));
        }
        Ok(())
    }

    pub fn remote_description_known(&self) -> bool {
        self.lock().remote.is_some()
    }

    pub fn local_description(&self) -> Option<SessionDescription> {
        self.lock().local.clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.lock().remote.clone()
    }

    pub fn pending(&self) -> Vec<Candidate> {
        self.lock().pending.iter().cloned().collect()
    }

    /// Close the buffer. Pending candidates are discarded and nothing is
    /// handed out for transmission afterwards. Returns how many were dropped.
    pub fn close(&self) -> usize {
        let mut state = self.lock();
        state.closed = true;
        let dropped = state.pending.len();
        state.pending.clear();
        dropped
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
