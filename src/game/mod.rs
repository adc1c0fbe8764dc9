//! Match state and the pure decision logic applied to each poll result
//!
//! # Module Organization
//!
//! - `phase` - [`GamePhase`] and its allowed edges
//! - `state` - session identity, ply counter and local mirrors
//! - `types` - moves, poll outcomes, finish payloads, board views
//! - `dispatch` - chooses what a classified poll result should do
//! - `move_gate` - exactly-once application of opponent moves
//! - `reset` - two-phase reset negotiation
//! - `undo` - single-shot retraction of the last ply
//! - `termination` - resign / checkmate finalization
//!
//! Nothing here performs I/O. The networking layer feeds results in and
//! carries out the returned decisions.

pub mod dispatch;
pub mod move_gate;
pub mod phase;
pub mod reset;
pub mod state;
pub mod termination;
pub mod types;
pub mod undo;

pub use phase::{GamePhase, PhaseEvent};
pub use state::{MatchSession, MatchState, OverrideCause, PlyCounter};
pub use types::{BoardView, FinishInfo, FinishReason, Markers, MoveIntent, MoveRecord, PollOutcome};
