//! Local mirror of the authoritative match state
//!
//! [`MatchState`] is owned by the sync client and mutated only from its
//! single task. The phase field is private: the only way to change it is
//! [`MatchState::transition`], which refuses edges the phase machine does not
//! define.

use super::phase::{GamePhase, PhaseEvent};
use super::types::{BoardView, Markers, MoveRecord};
use match_protocol::{Role, SessionKey};
use tracing::{debug, error};

/// Identity of this participant within a paired session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSession {
    pub key: SessionKey,
    pub role: Role,
    /// Who moves first in the current game
    pub first: Role,
    /// Id sent where the service wants a player rather than a seat
    pub player_id: String,
}

impl MatchSession {
    pub fn new(key: SessionKey, role: Role, first: Role) -> Self {
        let player_id = key.id_of(role).to_string();
        Self {
            key,
            role,
            first,
            player_id,
        }
    }

    pub fn with_player_id(mut self, player_id: impl Into<String>) -> Self {
        self.player_id = player_id.into();
        self
    }

    pub fn peer(&self) -> Role {
        self.role.peer()
    }

    /// Whose turn it is after `ply` plies, counting from the first mover.
    pub fn turn_at(&self, ply: u32) -> Role {
        if ply % 2 == 0 {
            self.first
        } else {
            self.first.peer()
        }
    }
}

/// Why the ply counter is being overwritten instead of advanced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideCause {
    Resync,
    Undo,
    ResetAccepted,
    ForceReset,
    Recovery,
    MatchEntry,
}

/// Number of plies the local side has applied.
///
/// Only moves forward through [`advance_to`](PlyCounter::advance_to); going
/// back requires naming an [`OverrideCause`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlyCounter(u32);

impl PlyCounter {
    pub fn get(self) -> u32 {
        self.0
    }

    /// Move forward to `ply`. Returns `false` (and leaves the counter alone)
    /// if that would go backwards.
    pub fn advance_to(&mut self, ply: u32) -> bool {
        if ply < self.0 {
            return false;
        }
        self.0 = ply;
        true
    }

    pub fn increment(&mut self) {
        self.0 = self.0.saturating_add(1);
    }

    pub fn overwrite(&mut self, ply: u32, cause: OverrideCause) {
        debug!("[SYNC] Ply counter {} -> {} ({:?})", self.0, ply, cause);
        self.0 = ply;
    }
}

/// Everything the client believes about the match right now
#[derive(Debug, Clone)]
pub struct MatchState {
    pub session: MatchSession,
    phase: GamePhase,
    ply: PlyCounter,
    /// Ply count right after our own most recent submission
    pub last_self_ply: u32,
    pub history: Vec<MoveRecord>,
    /// Who holds the turn, once known
    pub turn: Option<Role>,
    pub last_mover: Option<Role>,
    pub known_epoch: Option<u64>,
    pub in_check: bool,
    pub opponent_comment: Option<String>,
    pub board: Option<BoardView>,
}

impl MatchState {
    pub fn new(session: MatchSession) -> Self {
        Self {
            session,
            phase: GamePhase::Idle,
            ply: PlyCounter::default(),
            last_self_ply: 0,
            history: Vec::new(),
            turn: None,
            last_mover: None,
            known_epoch: None,
            in_check: false,
            opponent_comment: None,
            board: None,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn role(&self) -> Role {
        self.session.role
    }

    pub fn ply(&self) -> u32 {
        self.ply.get()
    }

    pub fn is_my_turn(&self) -> bool {
        self.turn == Some(self.session.role)
    }

    /// Apply `event` to the phase machine. Invalid edges are logged and ignored.
    pub fn transition(&mut self, event: PhaseEvent) -> bool {
        match self.phase.next(event) {
            Some(next) => {
                debug!("[SYNC] Phase {} -> {} ({:?})", self.phase, next, event);
                self.phase = next;
                true
            }
            None => {
                error!(
                    "[SYNC] Invalid phase transition from {} on {:?}",
                    self.phase, event
                );
                false
            }
        }
    }

    pub fn advance_ply(&mut self, ply: u32) -> bool {
        self.ply.advance_to(ply)
    }

    pub fn increment_ply(&mut self) {
        self.ply.increment();
    }

    /// Zero the ply counter and every move mirror.
    pub fn zero_mirrors(&mut self, cause: OverrideCause) {
        self.ply.overwrite(0, cause);
        self.last_self_ply = 0;
        self.history.clear();
        self.last_mover = None;
        self.in_check = false;
    }

    /// Take the service's ply count as truth, trimming anything we hold beyond it.
    pub fn adopt_ply(&mut self, ply: u32, cause: OverrideCause) {
        self.ply.overwrite(ply, cause);
        self.last_self_ply = self.last_self_ply.min(ply);
        self.history.truncate(ply as usize);
        if self.history.len() < ply as usize {
            // History cannot be rebuilt from a board snapshot; the mover of
            // the latest ply is known only from markers.
            self.last_mover = None;
        } else {
            self.last_mover = self.history.last().and_then(|record| record.by);
        }
    }

    /// Record per-response markers. Returns `true` when the reset epoch changed.
    pub fn observe_markers(&mut self, markers: &Markers) -> bool {
        if let Some(last_by) = markers.last_by {
            if markers.ply.is_none_or(|ply| ply == self.ply()) {
                self.last_mover = Some(last_by);
            }
        }

        match markers.epoch {
            Some(epoch) => {
                let changed = self.known_epoch.is_some_and(|known| known != epoch);
                self.known_epoch = Some(epoch);
                changed
            }
            None => false,
        }
    }

    /// Turn holder derived from the ply count alone.
    pub fn parity_turn(&self) -> Role {
        self.session.turn_at(self.ply())
    }
}
