//! Post-game heartbeat
//!
//! Once a game is over the ordinary poll loop stops. The heartbeat keeps a
//! coarse watch on the authoritative board so a restarted session (the peer
//! forced a reset, or a new game was started) brings this client back to
//! `Active`. It reads the board endpoint only, so it never consumes one-shot
//! notices meant for the poll loop and never touches move or turn state.

use super::scheduler::PollScheduler;
use match_protocol::BoardResponse;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug)]
pub struct PostGameHeartbeat {
    scheduler: PollScheduler,
    seen_epoch: Option<u64>,
}

impl Default for PostGameHeartbeat {
    fn default() -> Self {
        Self::new()
    }
}

impl PostGameHeartbeat {
    pub fn new() -> Self {
        Self {
            scheduler: PollScheduler::new("heartbeat"),
            seen_epoch: None,
        }
    }

    /// Start watching. `epoch` is the reset epoch in force when the game ended.
    pub fn arm(&mut self, epoch: Option<u64>, interval: Duration) {
        if self.scheduler.is_active() {
            return;
        }
        info!("[HEARTBEAT] Armed, checking every {:?}", interval);
        self.seen_epoch = epoch;
        self.scheduler.start(interval);
    }

    pub fn disarm(&mut self) {
        if self.scheduler.is_active() {
            debug!("[HEARTBEAT] Disarmed");
        }
        self.scheduler.stop();
    }

    pub fn is_armed(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn reschedule(&mut self, interval: Duration) {
        self.scheduler.queue_next(interval);
    }

    pub async fn fired(&mut self) {
        self.scheduler.fired().await
    }

    /// Whether this board snapshot shows the session was restarted.
    ///
    /// Recovery means any of: the reset epoch moved, the service reports the
    /// `init` phase, or the ply count is back to zero with no winner.
    pub fn detect(&mut self, board: &BoardResponse) -> bool {
        if board.board.is_none() {
            return false;
        }

        let epoch_changed = match (self.seen_epoch, board.reset_epoch) {
            (Some(seen), Some(now)) => seen != now,
            (None, Some(now)) => {
                self.seen_epoch = Some(now);
                false
            }
            _ => false,
        };
        let phase_init = board.phase.as_deref() == Some("init");
        let cleared = board.winner.is_none() && board.kifu_len == Some(0);

        let recovered = epoch_changed || phase_init || cleared;
        if recovered {
            info!(
                "[HEARTBEAT] Session restarted (epoch_changed={}, init={}, cleared={})",
                epoch_changed, phase_init, cleared
            );
            if let Some(now) = board.reset_epoch {
                self.seen_epoch = Some(now);
            }
        }
        recovered
    }
}
