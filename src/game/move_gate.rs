//! Exactly-once application of opponent moves
//!
//! The same move is usually reported by several consecutive polls, and our
//! own submissions come back to us as well. A move passes the gate only if:
//!
//! - its initiator is not the local role (when the wire names one),
//! - its ply is past the last ply we observed for our own submission,
//! - its ply is past the local counter.
//!
//! The ply rules alone still filter correctly when the initiator is missing.
//!
//! The sync client admits and completes a move inside one synchronous step
//! of its single-owner loop, so it never observes the gate busy. The busy
//! flag guards callers that hold an [`Admission`] across an await.

use super::state::MatchState;
use super::types::MoveRecord;
use tracing::{debug, info};

/// Why a reported move was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Our own move echoed back
    SelfEcho,
    /// At or before the ply of our last submission
    SelfObserved { ply: u32, last_self: u32 },
    /// Already applied locally
    AlreadyApplied { ply: u32, local: u32 },
    /// Another move is still being applied
    Busy,
}

/// Ticket for a move that passed the gate; hand it back to [`MoveGate::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Admission {
    pub target_ply: u32,
}

#[derive(Debug, Default)]
pub struct MoveGate {
    busy: bool,
}

impl MoveGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Decide whether `record` (reported at `ply`) should be applied.
    /// On success the gate is busy until [`complete`](Self::complete) or
    /// [`abandon`](Self::abandon).
    pub fn admit(
        &mut self,
        state: &MatchState,
        record: &MoveRecord,
        ply: Option<u32>,
    ) -> Result<Admission, Rejection> {
        if self.busy {
            return Err(Rejection::Busy);
        }

        if record.by == Some(state.role()) {
            return Err(Rejection::SelfEcho);
        }

        let local = state.ply();
        let target_ply = match ply {
            Some(ply) => {
                if ply <= state.last_self_ply {
                    return Err(Rejection::SelfObserved {
                        ply,
                        last_self: state.last_self_ply,
                    });
                }
                if local >= ply {
                    return Err(Rejection::AlreadyApplied { ply, local });
                }
                ply
            }
            None => local.saturating_add(1),
        };

        self.busy = true;
        Ok(Admission { target_ply })
    }

    /// Record an admitted move in the local mirrors and hand the turn to us.
    pub fn complete(
        &mut self,
        state: &mut MatchState,
        admission: Admission,
        record: MoveRecord,
        in_check: bool,
    ) {
        let peer = state.session.peer();
        if !state.advance_ply(admission.target_ply) {
            debug!(
                "[MOVE_GATE] Counter already past ply {}, keeping {}",
                admission.target_ply,
                state.ply()
            );
        }

        state.turn = Some(state.role());
        state.in_check = in_check;
        state.last_mover = Some(peer);

        info!(
            "[MOVE_GATE] Applied opponent move {:?} -> {} at ply {}",
            record.from,
            record.to,
            state.ply()
        );
        state.history.push(MoveRecord {
            by: Some(peer),
            ..record
        });
        self.busy = false;
    }

    /// Release the gate without applying anything.
    pub fn abandon(&mut self) {
        self.busy = false;
    }
}
