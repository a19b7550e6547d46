//! Inspect mode: pointer tracking with a restart-on-change debounce.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

use crate::dom::DomId;

#[derive(Debug, Clone)]
pub struct InspectMode {
    active: bool,
    debounce: Duration,
    last_target: Option<DomId>,
    deadline: Option<Instant>,
}

impl InspectMode {
    pub fn new(debounce: Duration) -> Self {
        Self {
            active: false,
            debounce,
            last_target: None,
            deadline: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Stop tracking. A pending lookup is dropped.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.last_target = None;
        self.deadline = None;
    }

    /// Record a pointer move. A new target restarts the timer; the same
    /// target leaves a running timer alone. Returns whether the timer restarted.
    pub fn pointer_moved(&mut self, target: DomId, now: Instant) -> bool {
        if !self.active || self.last_target == Some(target) {
            return false;
        }
        self.last_target = Some(target);
        self.deadline = Some(now + self.debounce);
        true
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The target whose timer has run out by `now`, if any. Fires once.
    pub fn poll(&mut self, now: Instant) -> Option<DomId> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.last_target
            }
            _ => None,
        }
    }

    /// Wait for the running timer. `None` if no timer is running.
    pub async fn settled(&mut self) -> Option<DomId> {
        let deadline = self.deadline?;
        sleep_until(deadline).await;
        self.poll(deadline)
    }
}
