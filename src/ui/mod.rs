//! Presentation seam
//!
//! The sync client never draws anything itself. It reports what changed to a
//! [`Presenter`]; the binary uses [`ConsolePresenter`], tests record calls.

pub mod presenter;

pub use presenter::{ConsolePresenter, Presenter};
