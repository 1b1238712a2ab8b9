//! Session countdown.
//!
//! [`SessionClock`] is the pure countdown state; [`Ticker`] is the cancellable
//! background task that drives it once per period.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

/// Seconds remaining below which the warning is raised.
pub const WARNING_THRESHOLD_SECS: u64 = 300;

/// What a single tick did to the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    Tick { remaining: u64 },
    /// Remaining time dropped below the warning threshold for the first time.
    WarningCrossed { remaining: u64 },
    /// The countdown reached zero. Fired once.
    Expired,
    /// The clock had already expired; nothing changed.
    Stopped,
}

#[derive(Debug, Clone)]
pub struct SessionClock {
    duration_secs: u64,
    remaining_secs: u64,
    warning_threshold_secs: u64,
    warning_crossed: bool,
    expired: bool,
}

impl SessionClock {
    pub fn new(duration_secs: u64, warning_threshold_secs: u64) -> Self {
        Self {
            duration_secs,
            remaining_secs: duration_secs,
            warning_threshold_secs,
            warning_crossed: false,
            expired: false,
        }
    }

    pub fn from_minutes(minutes: u32) -> Self {
        Self::new(u64::from(minutes) * 60, WARNING_THRESHOLD_SECS)
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> ClockEvent {
        if self.expired {
            return ClockEvent::Stopped;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        let crossing = !self.warning_crossed && self.remaining_secs < self.warning_threshold_secs;
        if crossing {
            self.warning_crossed = true;
        }
        if self.remaining_secs == 0 {
            self.expired = true;
            ClockEvent::Expired
        } else if crossing {
            ClockEvent::WarningCrossed {
                remaining: self.remaining_secs,
            }
        } else {
            ClockEvent::Tick {
                remaining: self.remaining_secs,
            }
        }
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.duration_secs - self.remaining_secs
    }

    pub fn warning_crossed(&self) -> bool {
        self.warning_crossed
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }
}

/// A repeating background task, aborted when dropped.
#[derive(Debug)]
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Call `on_tick` every `period`, starting one period from now, until it breaks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if on_tick().await.is_break() {
                    break;
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Stop the task. Takes effect at its next suspension point.
    pub fn cancel(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Release the handle without aborting, for use from inside the task itself.
    pub fn detach(mut self) {
        self.handle.take();
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
