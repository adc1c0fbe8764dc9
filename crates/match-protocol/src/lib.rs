//! Wire protocol shared between the polling client and the match service.
//!
//! Everything here is plain serde data. Field names follow the service's JSON
//! (`kifu_len`, `reset_epoch`, `client_kifu_len`, ...) so the client can talk
//! to the existing endpoints without a translation layer.

pub mod protocol;

pub use protocol::*;
