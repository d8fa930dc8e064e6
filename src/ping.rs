//! PING issuance and acknowledgement matching
//!
//! Pings we initiate get sequence-derived opaque payloads, so duplicates
//! cannot occur and an ack is matched to exactly one pending ping. Echoing
//! the peer's pings is the dispatcher's job; the handler only tracks ours.

use super::error::{Error, Result};
use std::collections::HashMap;

/// Bound on pings awaiting acknowledgement
pub const MAX_PENDING_PINGS: usize = 32;

/// Terminal results retained for late queries
const RESULT_RETENTION: u64 = 64;

/// Handle to a ping issued with [`PingHandler::begin`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PingId(u64);

/// Observable state of an issued ping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingState {
    /// PING emitted, ack not yet received
    Pending,
    /// Matching ack received
    Acked,
    /// Connection terminated before the ack arrived
    Failed,
}

/// Tracks pings we initiated.
#[derive(Debug, Default)]
pub struct PingHandler {
    /// Opaque payload -> sequence number of the pending ping
    pending: HashMap<[u8; 8], u64>,
    /// Terminal results, pruned after RESULT_RETENTION newer pings
    results: HashMap<u64, PingState>,
    next_seq: u64,
}

impl PingHandler {
    /// Create an empty handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new ping and return its handle and wire payload.
    pub fn begin(&mut self) -> Result<(PingId, [u8; 8])> {
        if self.pending.len() >= MAX_PENDING_PINGS {
            return Err(Error::TooManyPings);
        }
        self.next_seq += 1;
        let payload = self.next_seq.to_be_bytes();
        self.pending.insert(payload, self.next_seq);
        Ok((PingId(self.next_seq), payload))
    }

    /// Resolve the pending ping matching an inbound ack payload.
    ///
    /// An ack that matches nothing is stale or fabricated: protocol error.
    pub fn on_ack(&mut self, payload: [u8; 8]) -> Result<PingId> {
        match self.pending.remove(&payload) {
            Some(seq) => {
                self.results.insert(seq, PingState::Acked);
                self.prune();
                Ok(PingId(seq))
            }
            None => Err(Error::Protocol(format!(
                "PING ack with unmatched payload {:02x?}",
                payload
            ))),
        }
    }

    /// Fail every pending ping (connection terminated).
    pub fn fail_all(&mut self) {
        for (_, seq) in self.pending.drain() {
            self.results.insert(seq, PingState::Failed);
        }
        self.prune();
    }

    /// Observable state of a ping.
    pub fn state(&self, id: PingId) -> PingState {
        if let Some(state) = self.results.get(&id.0) {
            return *state;
        }
        if self.pending.values().any(|seq| *seq == id.0) {
            return PingState::Pending;
        }
        // Pruned or never issued: nothing will resolve it.
        PingState::Failed
    }

    /// Number of pings awaiting acknowledgement
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn prune(&mut self) {
        let horizon = self.next_seq.saturating_sub(RESULT_RETENTION);
        self.results.retain(|seq, _| *seq > horizon);
    }
}
