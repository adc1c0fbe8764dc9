//! Match phase state machine
//!
//! One enum replaces the pile of independent booleans a polling client tends
//! to grow (`resetting`, `game_over`, `in_post_game`, ...). Every change goes
//! through [`GamePhase::next`], which only knows the edges below:
//!
//! ```text
//! Idle --MatchStarted--> Active
//! Active --ResetProposed--> ResetRequested --ResetAccepted--> Resetting --Reinitialized--> Active
//! Active | ResetRequested --Finished--> Finished --HeartbeatArmed--> PostGameRecovery
//! PostGameRecovery --RecoveryDetected--> Active
//! (any) --ForceReset--> Resetting
//! ```

use std::fmt;

/// Where the local participant is in the match lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GamePhase {
    /// Session exists but the match has not started
    ///
    /// Valid transitions: → Active, → Resetting (forced)
    #[default]
    Idle,

    /// Moves are flowing
    ///
    /// Valid transitions: → ResetRequested, → Finished, → Resetting (forced)
    Active,

    /// A reset proposal from either side is outstanding
    ///
    /// Valid transitions: → Resetting, → Finished, → Resetting (forced)
    ResetRequested,

    /// Both sides agreed; waiting for the authoritative initial position
    ///
    /// Valid transitions: → Active
    Resetting,

    /// Resigned or checkmated; interaction disabled
    ///
    /// Valid transitions: → PostGameRecovery, → Resetting (forced)
    Finished,

    /// Terminated, with the heartbeat watching for a restarted session
    ///
    /// Valid transitions: → Active, → Resetting (forced)
    PostGameRecovery,
}

/// Inputs that move the phase machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseEvent {
    MatchStarted,
    ResetProposed,
    ResetAccepted,
    Reinitialized,
    Finished,
    HeartbeatArmed,
    RecoveryDetected,
    ForceReset,
}

impl GamePhase {
    /// Target phase for `event`, or `None` if the edge does not exist.
    pub fn next(self, event: PhaseEvent) -> Option<GamePhase> {
        use GamePhase::*;
        use PhaseEvent as E;

        match (self, event) {
            (_, E::ForceReset) => Some(Resetting),
            (Idle, E::MatchStarted) => Some(Active),
            (Active, E::ResetProposed) => Some(ResetRequested),
            (ResetRequested, E::ResetAccepted) => Some(Resetting),
            (Resetting, E::Reinitialized) => Some(Active),
            (Active | ResetRequested, E::Finished) => Some(Finished),
            (Finished, E::HeartbeatArmed) => Some(PostGameRecovery),
            (PostGameRecovery, E::RecoveryDetected) => Some(Active),
            _ => None,
        }
    }

    /// Terminal phases: polling is stopped and only the heartbeat may run
    pub fn is_terminal(self) -> bool {
        matches!(self, GamePhase::Finished | GamePhase::PostGameRecovery)
    }

    /// Phases in which ordinary poll results are acted on
    pub fn is_polling(self) -> bool {
        matches!(
            self,
            GamePhase::Active | GamePhase::ResetRequested | GamePhase::Resetting
        )
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GamePhase::Idle => "Idle",
            GamePhase::Active => "Active",
            GamePhase::ResetRequested => "ResetRequested",
            GamePhase::Resetting => "Resetting",
            GamePhase::Finished => "Finished",
            GamePhase::PostGameRecovery => "PostGameRecovery",
        };
        f.write_str(name)
    }
}
