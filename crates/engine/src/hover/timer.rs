// Cancellable delayed task driven by an explicit clock.
//
// The host polls `fire_due_at` from its event loop. Each schedule gets a new
// token, so a stale token can never cancel or fire a newer task.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskToken(u64);

#[derive(Debug, Default)]
pub struct DelayedTask {
    next_token: u64,
    pending: Option<(TaskToken, Instant)>,
}

impl DelayedTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the task `delay` after `now`, replacing any pending one.
    pub fn schedule_at(&mut self, now: Instant, delay: Duration) -> TaskToken {
        self.next_token += 1;
        let token = TaskToken(self.next_token);
        self.pending = Some((token, now + delay));
        token
    }

    /// Cancel whatever is pending. Safe to call when nothing is.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Cancel only if `token` is still the pending task.
    pub fn cancel_token(&mut self, token: TaskToken) -> bool {
        if self.pending_token() == Some(token) {
            self.pending = None;
            return true;
        }
        false
    }

    /// Consume and return the pending task if its deadline has passed.
    pub fn fire_due_at(&mut self, now: Instant) -> Option<TaskToken> {
        match self.pending {
            Some((token, deadline)) if now >= deadline => {
                self.pending = None;
                Some(token)
            }
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_token(&self) -> Option<TaskToken> {
        self.pending.map(|(token, _)| token)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|(_, deadline)| deadline)
    }
}
