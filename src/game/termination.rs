//! Idempotent end-of-game handling
//!
//! The first resign / checkmate result wins. Later reports of the same end
//! (every poll repeats it until the session restarts) are ignored because the
//! phase is already terminal.

use super::phase::PhaseEvent;
use super::state::{MatchSession, MatchState};
use super::types::{FinishInfo, FinishReason};
use tracing::{debug, info, warn};

/// Result of the game from the local side's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Won,
    Lost,
    Undecided,
}

pub struct TerminationHandler;

impl TerminationHandler {
    /// Local verdict. A resignation is judged by the resigner (id first, then
    /// seat); otherwise by the winner.
    pub fn verdict(session: &MatchSession, info: &FinishInfo) -> Verdict {
        if info.reason == FinishReason::Resign {
            let resigned_locally = match (&info.resigner_id, info.resigner) {
                (Some(id), _) => Some(*id == session.player_id),
                (None, Some(role)) => Some(role == session.role),
                (None, None) => None,
            };
            if let Some(local) = resigned_locally {
                return if local { Verdict::Lost } else { Verdict::Won };
            }
        }

        match info.winner {
            Some(winner) if winner == session.role => Verdict::Won,
            Some(_) => Verdict::Lost,
            None => Verdict::Undecided,
        }
    }

    pub fn outcome_message(session: &MatchSession, info: &FinishInfo) -> String {
        let verdict = Self::verdict(session, info);
        let text = match (info.reason, verdict) {
            (FinishReason::Resign, Verdict::Lost) => "You resigned. You lose.",
            (FinishReason::Resign, Verdict::Won) => "Your opponent resigned. You win!",
            (FinishReason::Resign, Verdict::Undecided) => "The game ended by resignation.",
            (FinishReason::Checkmate, Verdict::Won) => "Checkmate. You win!",
            (FinishReason::Checkmate, Verdict::Lost) => "Checkmate. You lose.",
            (FinishReason::Checkmate, Verdict::Undecided) => "Checkmate.",
        };
        text.to_string()
    }

    /// Move to `Finished` unless already terminal. Returns `true` only for the
    /// call that actually ended the game.
    pub fn finalize(state: &mut MatchState, info: &FinishInfo) -> bool {
        if state.phase().is_terminal() {
            debug!("[END] Already finished, ignoring {:?}", info.reason);
            return false;
        }
        if !state.transition(PhaseEvent::Finished) {
            warn!(
                "[END] Finish report ignored in phase {}",
                state.phase()
            );
            return false;
        }

        state.in_check = false;
        if let Some(board) = &info.board {
            state.board = Some(board.clone());
        }
        info!(
            "[END] Game over ({:?}), winner {:?}",
            info.reason, info.winner
        );
        true
    }

    /// Hand over to the post-game heartbeat.
    pub fn arm_heartbeat(state: &mut MatchState) -> bool {
        state.transition(PhaseEvent::HeartbeatArmed)
    }
}
