//! Two-phase reset negotiation between the two seats
//!
//! ```text
//! None -> Requested(by = self | peer) -> Accepted -> None
//! ```
//!
//! The proposer must hold the turn. The other side sees an accept prompt once
//! and ordinary move handling is suspended until it accepts. Acceptance puts
//! both sides through `Resetting`, where mirrors are zeroed and the initial
//! position is fetched from the service.

use super::phase::{GamePhase, PhaseEvent};
use super::state::{MatchState, OverrideCause};
use crate::core::error::PreconditionError;
use match_protocol::Role;
use tracing::{debug, info, warn};

/// An outstanding reset proposal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingResetRequest {
    pub initiator: Role,
    pub comment: String,
    /// Set once acceptance has been observed or sent
    pub acknowledged: bool,
}

/// What the client should do about an observed reset request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestNotice {
    /// Our own proposal is still waiting for the peer
    AwaitingPeer,
    /// The peer proposed; show the accept prompt with this comment
    PromptLocal { comment: String },
    /// The peer's prompt is already on screen
    AlreadyPrompted,
}

#[derive(Debug, Default)]
pub struct ResetNegotiator {
    pending: Option<PendingResetRequest>,
    prompt_shown: bool,
}

impl ResetNegotiator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&PendingResetRequest> {
        self.pending.as_ref()
    }

    pub fn is_prompt_shown(&self) -> bool {
        self.prompt_shown
    }

    /// Our own proposal is outstanding
    pub fn awaiting_peer(&self, local: Role) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| p.initiator == local && !p.acknowledged)
    }

    pub fn check_request(&self, state: &MatchState) -> Result<(), PreconditionError> {
        if state.phase() != GamePhase::Active {
            return Err(PreconditionError::WrongPhase {
                operation: "request_reset",
                phase: state.phase(),
            });
        }
        if !state.is_my_turn() {
            return Err(PreconditionError::NotYourTurn);
        }
        Ok(())
    }

    /// The service accepted our proposal.
    pub fn proposal_sent(&mut self, state: &mut MatchState, comment: String) {
        info!("[RESET] Proposal sent, waiting for {}", state.session.peer());
        self.pending = Some(PendingResetRequest {
            initiator: state.role(),
            comment,
            acknowledged: false,
        });
        state.transition(PhaseEvent::ResetProposed);
    }

    /// A poll reported a pending reset request.
    pub fn observe_request(
        &mut self,
        state: &mut MatchState,
        initiator: Role,
        comment: String,
    ) -> RequestNotice {
        if state.phase() == GamePhase::Active {
            state.transition(PhaseEvent::ResetProposed);
        }

        let replace = self
            .pending
            .as_ref()
            .is_none_or(|p| p.initiator != initiator);
        if replace {
            debug!("[RESET] Tracking request from {}", initiator);
            self.pending = Some(PendingResetRequest {
                initiator,
                comment: comment.clone(),
                acknowledged: false,
            });
            self.prompt_shown = false;
        }

        if initiator == state.role() {
            return RequestNotice::AwaitingPeer;
        }

        if self.prompt_shown {
            RequestNotice::AlreadyPrompted
        } else {
            info!("[RESET] {} asked for a reset: {:?}", initiator, comment);
            self.prompt_shown = true;
            RequestNotice::PromptLocal { comment }
        }
    }

    pub fn check_accept(&self, state: &MatchState) -> Result<(), PreconditionError> {
        if state.phase() != GamePhase::ResetRequested {
            return Err(PreconditionError::WrongPhase {
                operation: "accept_reset",
                phase: state.phase(),
            });
        }
        match &self.pending {
            Some(p) if p.initiator != state.role() => Ok(()),
            _ => Err(PreconditionError::NoPendingReset),
        }
    }

    /// Acceptance confirmed (sent by us or observed from the peer): enter
    /// `Resetting` and zero the mirrors.
    pub fn begin_reset(&mut self, state: &mut MatchState) -> bool {
        if !state.transition(PhaseEvent::ResetAccepted) {
            warn!("[RESET] Acceptance ignored in phase {}", state.phase());
            return false;
        }
        if let Some(pending) = self.pending.as_mut() {
            pending.acknowledged = true;
        }
        state.zero_mirrors(OverrideCause::ResetAccepted);
        state.in_check = false;
        info!("[RESET] Reset accepted, reinitialising");
        true
    }

    /// Initial position is in place; back to `Active`.
    pub fn finish_reset(&mut self, state: &mut MatchState) -> bool {
        self.clear();
        state.transition(PhaseEvent::Reinitialized)
    }

    /// Drop any pending request. Returns `true` if an accept prompt was visible.
    pub fn clear(&mut self) -> bool {
        self.pending = None;
        std::mem::take(&mut self.prompt_shown)
    }
}
