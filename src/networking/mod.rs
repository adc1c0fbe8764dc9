//! Networking layer - transport seam, HTTP client and the poll loop
//!
//! - [`scheduler`] - single pending tick timer
//! - [`transport`] - [`MatchTransport`] trait the client talks through
//! - [`http`] - reqwest implementation against the match service
//! - [`classify`] - turns a raw poll payload into one [`PollOutcome`](crate::game::PollOutcome)
//! - [`heartbeat`] - coarse post-game watch for a restarted session
//! - [`client`] - [`SyncClient`], the owner of all match state

pub mod classify;
pub mod client;
pub mod heartbeat;
pub mod http;
pub mod scheduler;
pub mod transport;

pub use client::{Intent, SyncClient};
pub use heartbeat::PostGameHeartbeat;
pub use http::HttpTransport;
pub use scheduler::PollScheduler;
pub use transport::MatchTransport;
