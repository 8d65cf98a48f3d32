//! Per-question countdown.
//!
//! The page runs a one-second interval that posts the handle it was given
//! back to `/api/game/tick`. Starting or cancelling the countdown retires the
//! current handle, so ticks from an interval the page failed to clear are
//! ignored instead of counting down (or timing out) a newer question.

use serde::{Deserialize, Serialize};

/// Identifies one started countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerHandle(pub u64);

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The handle is not the running countdown.
    Stale,
    Running { remaining: u32 },
    Expired,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    remaining: u32,
    active: Option<TimerHandle>,
    next_id: u64,
}

impl Countdown {
    pub fn new(duration: u32) -> Self {
        Self {
            remaining: duration,
            active: None,
            next_id: 1,
        }
    }

    /// Cancel any running countdown and start a fresh one.
    pub fn start(&mut self, duration: u32) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.remaining = duration;
        self.active = Some(handle);
        handle
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }

    /// Cancel and restore the full duration on the display without starting.
    pub fn reset(&mut self, duration: u32) {
        self.cancel();
        self.remaining = duration;
    }

    /// Cancel and show zero (manual "time's up").
    pub fn expire(&mut self) {
        self.cancel();
        self.remaining = 0;
    }

    pub fn tick(&mut self, handle: TimerHandle) -> TickOutcome {
        if self.active != Some(handle) {
            return TickOutcome::Stale;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.active = None;
            TickOutcome::Expired
        } else {
            TickOutcome::Running {
                remaining: self.remaining,
            }
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn handle(&self) -> Option<TimerHandle> {
        self.active
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }
}

/// Format seconds as `m:ss`.
pub fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
