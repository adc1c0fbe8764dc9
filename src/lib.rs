//! Polling match-synchronization core for a two-player shogi client.
//!
//! The remote service is authoritative; this crate keeps one participant's
//! view of the match consistent with it using nothing but periodic
//! request/response polling.

pub mod core;
pub mod game;
pub mod networking;
pub mod ui;
