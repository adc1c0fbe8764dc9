//! Error types for the sync client
//!
//! Three layers of failure are kept apart:
//! - [`TransportError`]: the request never produced a usable answer. The poll
//!   loop absorbs these and retries with backoff.
//! - [`PreconditionError`]: a user intent was refused locally before anything
//!   was sent. State is untouched.
//! - [`ActionError`]: what a public intent method hands back to its caller.
//!
//! [`TickFault`] is internal to a single tick and never escapes the loop.

use crate::game::phase::GamePhase;
use thiserror::Error;

/// Failure talking to the match service
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection, timeout or body-read failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status without a readable service message
    #[error("Service returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// Body did not match the expected payload shape
    #[error("Malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Service understood the request and refused it
    #[error("Service rejected request: {message}")]
    Rejected { message: String },

    /// Settings carried a server URL that cannot address an endpoint
    #[error("Invalid endpoint URL: {0}")]
    Endpoint(String),
}

impl TransportError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// Result type alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// A user intent that cannot run in the current local state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("It is not your turn")]
    NotYourTurn,

    #[error("{operation} is not allowed while the match is {phase}")]
    WrongPhase {
        operation: &'static str,
        phase: GamePhase,
    },

    #[error("Undo is only possible right after your own move")]
    UndoNotAllowed,

    #[error("An undo request is already in flight")]
    UndoInFlight,

    #[error("Only the main participant can force a reset")]
    MainOnly,

    #[error("No reset request from the opponent is pending")]
    NoPendingReset,

    #[error("Invalid move: {0}")]
    InvalidIntent(String),
}

/// Error returned by the client's public intent methods
#[derive(Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// The service call was attempted and did not succeed; local state is unchanged
    #[error("{operation} failed: {reason}")]
    Failed {
        operation: &'static str,
        reason: String,
    },
}

impl ActionError {
    pub fn failed(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Failed {
            operation,
            reason: err.to_string(),
        }
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, ActionError::Precondition(_))
    }
}

/// Result type alias for user intents
pub type ActionResult<T> = Result<T, ActionError>;

/// Why a tick produced no effect
#[derive(Error, Debug)]
pub enum TickFault {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Response was well-formed JSON but inconsistent with the protocol
    #[error("Protocol violation: {0}")]
    Protocol(String),
}

impl TickFault {
    pub fn protocol(detail: impl Into<String>) -> Self {
        Self::Protocol(detail.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_converts_into_action_error() {
        let err: ActionError = PreconditionError::MainOnly.into();
        assert!(err.is_precondition());
        assert_eq!(err.to_string(), "Only the main participant can force a reset");
    }

    #[test]
    fn test_wrong_phase_message_names_operation() {
        let err = PreconditionError::WrongPhase {
            operation: "undo",
            phase: GamePhase::Finished,
        };
        assert_eq!(err.to_string(), "undo is not allowed while the match is Finished");
    }

    #[test]
    fn test_failed_action_carries_reason() {
        let err = ActionError::failed("accept_reset", TransportError::rejected("no request"));
        assert!(!err.is_precondition());
        assert!(err.to_string().contains("no request"));
    }
}
