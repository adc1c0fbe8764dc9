//! Single-shot retraction of the last ply

use super::phase::GamePhase;
use super::state::{MatchState, OverrideCause};
use crate::core::error::PreconditionError;
use match_protocol::Role;
use tracing::info;

#[derive(Debug, Default)]
pub struct UndoCoordinator {
    in_flight: bool,
}

impl UndoCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Whether the undo affordance should be offered right now.
    pub fn eligible(&self, state: &MatchState) -> bool {
        !self.in_flight && Self::check_state(state).is_ok()
    }

    fn check_state(state: &MatchState) -> Result<(), PreconditionError> {
        if state.phase() != GamePhase::Active {
            return Err(PreconditionError::WrongPhase {
                operation: "undo",
                phase: state.phase(),
            });
        }
        if state.ply() == 0 || state.last_mover != Some(state.role()) {
            return Err(PreconditionError::UndoNotAllowed);
        }
        Ok(())
    }

    /// Claim the single undo slot.
    pub fn begin(&mut self, state: &MatchState) -> Result<(), PreconditionError> {
        if self.in_flight {
            return Err(PreconditionError::UndoInFlight);
        }
        Self::check_state(state)?;
        self.in_flight = true;
        Ok(())
    }

    /// The service retracted our ply; its values replace ours wholesale.
    pub fn succeeded(
        &mut self,
        state: &mut MatchState,
        ply: u32,
        turn: Option<Role>,
        last_by: Option<Role>,
    ) {
        state.adopt_ply(ply, OverrideCause::Undo);
        state.last_self_ply = ply;
        let turn = turn.unwrap_or_else(|| state.parity_turn());
        state.turn = Some(turn);
        state.last_mover = if ply == 0 { None } else { last_by };
        state.in_check = false;
        self.in_flight = false;
        info!("[UNDO] Retracted to ply {}", ply);
    }

    pub fn failed(&mut self) {
        self.in_flight = false;
    }

    /// The opponent retracted a ply.
    pub fn apply_peer_undo(state: &mut MatchState, ply: u32, turn: Option<Role>) {
        state.adopt_ply(ply, OverrideCause::Undo);
        let turn = turn.unwrap_or_else(|| state.parity_turn());
        state.turn = Some(turn);
        state.in_check = false;
        info!("[UNDO] Opponent retracted to ply {}", ply);
    }
}
