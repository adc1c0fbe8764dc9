//! Domain types shared by the game logic and the poll loop

use crate::core::error::PreconditionError;
use match_protocol::{BoardMatrix, Captured, PieceKind, Role, Square, BOARD_SQUARES};

/// One ply as recorded in the local history mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    /// Origin square; `None` for a drop
    pub from: Option<Square>,
    pub to: Square,
    pub drop: Option<PieceKind>,
    pub promote: bool,
    /// Who played it. Older service builds omit this.
    pub by: Option<Role>,
}

impl MoveRecord {
    pub fn is_drop(&self) -> bool {
        self.drop.is_some()
    }

    /// Squares to highlight after the move is shown.
    pub fn highlight(&self) -> Vec<Square> {
        self.from.into_iter().chain(std::iter::once(self.to)).collect()
    }
}

/// A move the local player wants to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveIntent {
    pub from: Option<Square>,
    pub to: Square,
    pub drop: Option<PieceKind>,
    pub promote: bool,
    pub comment: String,
}

impl MoveIntent {
    pub fn board_move(from: Square, to: Square, promote: bool) -> Self {
        Self {
            from: Some(from),
            to,
            drop: None,
            promote,
            comment: String::new(),
        }
    }

    pub fn drop_piece(piece: PieceKind, to: Square) -> Self {
        Self {
            from: None,
            to,
            drop: Some(piece),
            promote: false,
            comment: String::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Check the intent is well formed and return its normalized form
    /// (promotion cleared on drops).
    pub fn validated(mut self) -> Result<Self, PreconditionError> {
        if self.to >= BOARD_SQUARES {
            return Err(PreconditionError::InvalidIntent(format!(
                "target square {} is off the board",
                self.to
            )));
        }

        match (self.from, self.drop) {
            (Some(_), Some(_)) => {
                return Err(PreconditionError::InvalidIntent(
                    "a drop has no origin square".to_string(),
                ))
            }
            (None, None) => {
                return Err(PreconditionError::InvalidIntent(
                    "a board move needs an origin square".to_string(),
                ))
            }
            (Some(from), None) if from >= BOARD_SQUARES => {
                return Err(PreconditionError::InvalidIntent(format!(
                    "origin square {from} is off the board"
                )))
            }
            (Some(from), None) if from == self.to => {
                return Err(PreconditionError::InvalidIntent(
                    "origin and target are the same square".to_string(),
                ))
            }
            (None, Some(_)) => self.promote = false,
            (Some(_), None) => {}
        }

        Ok(self)
    }
}

/// What the board should look like on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardView {
    pub board: BoardMatrix,
    pub captured: Captured,
    pub highlight: Vec<Square>,
}

impl BoardView {
    pub fn new(board: BoardMatrix, captured: Option<Captured>) -> Self {
        Self {
            board,
            captured: captured.unwrap_or_default(),
            highlight: Vec::new(),
        }
    }

    pub fn highlighted(mut self, squares: Vec<Square>) -> Self {
        self.highlight = squares;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Resign,
    Checkmate,
}

impl FinishReason {
    pub fn parse(reason: &str) -> Option<Self> {
        match reason.trim().to_ascii_lowercase().as_str() {
            "resign" => Some(FinishReason::Resign),
            "checkmate" | "mate" => Some(FinishReason::Checkmate),
            _ => None,
        }
    }
}

/// Authoritative end-of-game payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishInfo {
    pub reason: FinishReason,
    pub winner: Option<Role>,
    pub resigner: Option<Role>,
    pub resigner_id: Option<String>,
    pub board: Option<BoardView>,
}

/// Bookkeeping fields the service attaches to every poll answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markers {
    pub ply: Option<u32>,
    pub epoch: Option<u64>,
    /// `init`, `playing` or `ended`
    pub phase: Option<String>,
    pub last_by: Option<Role>,
    pub comment: Option<String>,
}

impl Markers {
    pub fn is_init(&self) -> bool {
        self.phase.as_deref() == Some("init")
    }
}

/// Exactly one classified result of a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Wait,
    Move {
        record: MoveRecord,
        /// Service ply count after this move, when reported
        ply: Option<u32>,
        board: Option<BoardView>,
        in_check: bool,
    },
    Resync {
        ply: u32,
    },
    ResetRequested {
        initiator: Role,
        comment: String,
    },
    ResetAccepted,
    Undo {
        ply: u32,
        turn: Option<Role>,
        board: Option<BoardView>,
    },
    Finished(FinishInfo),
}

impl PollOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PollOutcome::Wait => "wait",
            PollOutcome::Move { .. } => "move",
            PollOutcome::Resync { .. } => "resync",
            PollOutcome::ResetRequested { .. } => "reset_requested",
            PollOutcome::ResetAccepted => "reset_accepted",
            PollOutcome::Undo { .. } => "undo",
            PollOutcome::Finished(_) => "finished",
        }
    }
}
