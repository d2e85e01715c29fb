// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time abstraction so respawn-interval and quiesce-timer logic can be
//! driven deterministically in tests instead of racing the wall clock.

use std::cell::Cell;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A source of "now", injected wherever the engine needs to reason about
/// elapsed time (the runaway-respawn window, kill-timers, quiesce ticks).
pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn epoch_ms(&self) -> u64;

    /// Elapsed time between two `epoch_ms()` readings.
    fn elapsed_since(&self, earlier_ms: u64) -> Duration {
        Duration::from_millis(self.epoch_ms().saturating_sub(earlier_ms))
    }
}

/// Real wall-clock time, used by the daemon.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A clock tests can step by hand, so respawn-window and kill-timer tests
/// don't need real sleeps.
#[derive(Debug, Default)]
pub struct FakeClock {
    now_ms: Cell<u64>,
}

impl FakeClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Cell::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.set(self.now_ms.get() + by.as_millis() as u64);
    }

    pub fn set(&self, epoch_ms: u64) {
        self.now_ms.set(epoch_ms);
    }
}

impl Clock for FakeClock {
    fn epoch_ms(&self) -> u64 {
        self.now_ms.get()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
