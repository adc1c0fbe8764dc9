//! Single pending-tick timer
//!
//! Replaces chains of ad-hoc timeouts with one owned deadline. Scheduling
//! always replaces the previous deadline, so there is never more than one
//! tick pending, and [`PollScheduler::fired`] can sit in a `tokio::select!`
//! arm without losing the deadline when another arm wins.

use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug)]
pub struct PollScheduler {
    name: &'static str,
    active: bool,
    deadline: Option<Instant>,
}

impl PollScheduler {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            active: false,
            deadline: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Activate and schedule; on an already active scheduler this is `queue_next`.
    pub fn start(&mut self, delay: Duration) {
        if self.active {
            self.queue_next(delay);
            return;
        }
        trace!("[POLL] {} started, first tick in {:?}", self.name, delay);
        self.active = true;
        self.deadline = Some(Instant::now() + delay);
    }

    /// Cancel the pending tick and deactivate. Idempotent.
    pub fn stop(&mut self) {
        if self.active {
            trace!("[POLL] {} stopped", self.name);
        }
        self.active = false;
        self.deadline = None;
    }

    /// Replace any pending tick with one `delay` from now. No-op while inactive.
    pub fn queue_next(&mut self, delay: Duration) {
        if !self.active {
            return;
        }
        self.deadline = Some(Instant::now() + delay);
    }

    /// Resolves when the pending tick is due and consumes it. Never resolves
    /// while nothing is scheduled.
    pub async fn fired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
