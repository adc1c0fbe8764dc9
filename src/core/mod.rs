//! Core module - error types and persisted client settings
//!
//! - [`error`] - transport, precondition and action errors shared by every layer
//! - [`settings`] - [`ClientSettings`] loaded from the platform config directory

pub mod error;
pub mod settings;

pub use error::{
    ActionError, ActionResult, PreconditionError, TickFault, TransportError, TransportResult,
};
pub use settings::{settings_path, ClientSettings, PollDelays};
