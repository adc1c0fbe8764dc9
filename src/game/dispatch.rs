//! Decide what a classified poll result should do
//!
//! [`plan`] is a pure function of the current phase, a few flags and the
//! outcome. Priority, highest first:
//!
//! 1. reset acceptance, or a moved reset epoch while any reset request is
//!    pending (the one-shot notice may reach the other side first, and a
//!    forced reset drops the request without ever announcing acceptance)
//! 2. resync
//! 3. reset request
//! 4. `Resetting` phase swallows moves and waits
//! 5. finish
//! 6. move
//! 7. undo
//! 8. wait
//!
//! The client carries the returned [`Directive`] out against its state.

use super::phase::GamePhase;
use super::types::{BoardView, FinishInfo, MoveRecord, PollOutcome};
use match_protocol::Role;

/// Facts about the local side that the planner needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchContext {
    pub phase: GamePhase,
    /// This response carried a reset epoch different from the last one seen
    pub epoch_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Both sides agreed: zero mirrors, enter `Resetting`, fetch the initial position
    CompleteReset,
    /// Still `Resetting`: retry fetching the initial position
    Reinitialize,
    /// Zero local mirrors and refetch the authoritative board
    Resync { ply: u32 },
    /// Track the request (prompt if it came from the peer)
    ObserveResetRequest { initiator: Role, comment: String },
    /// Negotiation in progress; nothing to apply
    Hold,
    Finalize(FinishInfo),
    ApplyMove {
        record: MoveRecord,
        ply: Option<u32>,
        board: Option<BoardView>,
        in_check: bool,
    },
    ApplyUndo {
        ply: u32,
        turn: Option<Role>,
        board: Option<BoardView>,
    },
    /// Nothing new
    Idle,
    /// Outcome does not apply in this phase
    Discard(&'static str),
}

pub fn plan(ctx: DispatchContext, outcome: PollOutcome) -> Directive {
    if !ctx.phase.is_polling() {
        return Directive::Discard("not polling in this phase");
    }

    let resetting = ctx.phase == GamePhase::Resetting;
    let negotiating = ctx.phase == GamePhase::ResetRequested;

    // The session was reinitialised under the pending request, whoever made it
    if negotiating && ctx.epoch_changed && !matches!(outcome, PollOutcome::Finished(_)) {
        return Directive::CompleteReset;
    }

    match outcome {
        PollOutcome::ResetAccepted => match ctx.phase {
            GamePhase::ResetRequested => Directive::CompleteReset,
            GamePhase::Resetting => Directive::Reinitialize,
            _ => Directive::Discard("reset acceptance outside negotiation"),
        },
        PollOutcome::Resync { .. } if resetting => Directive::Reinitialize,
        PollOutcome::Resync { ply } => Directive::Resync { ply },
        PollOutcome::ResetRequested { .. } if resetting => Directive::Reinitialize,
        PollOutcome::ResetRequested { initiator, comment } => {
            Directive::ObserveResetRequest { initiator, comment }
        }
        PollOutcome::Move { .. } | PollOutcome::Wait if resetting => Directive::Reinitialize,
        PollOutcome::Finished(info) => Directive::Finalize(info),
        PollOutcome::Move { .. } if negotiating => Directive::Hold,
        PollOutcome::Move {
            record,
            ply,
            board,
            in_check,
        } => Directive::ApplyMove {
            record,
            ply,
            board,
            in_check,
        },
        PollOutcome::Undo { .. } if negotiating || resetting => Directive::Hold,
        PollOutcome::Undo { ply, turn, board } => Directive::ApplyUndo { ply, turn, board },
        PollOutcome::Wait if negotiating => Directive::Hold,
        PollOutcome::Wait => Directive::Idle,
    }
}
