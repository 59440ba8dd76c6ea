//! Time sources and sleepers.
//!
//! A [`FixedWindow`](crate::FixedWindow) reads time through a [`Clock`] and the
//! retriers wait through a [`Sleep`], so both can be replaced by a
//! [`ManualClock`] in tests.

use std::{
    sync::Arc,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use parking_lot::Mutex;

/// A source of the current time in seconds.
///
/// Only differences between readings matter, so the origin is arbitrary.
/// Any `Fn() -> f64 + Send + Sync` closure is a clock.
pub trait Clock: Send + Sync {
    /// Current time in seconds.
    fn now(&self) -> f64;
}

impl<F> Clock for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn now(&self) -> f64 {
        self()
    }
}

/// Monotonic seconds since the clock was created. The default clock.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Wall clock seconds since the Unix epoch.
///
/// Wall time can jump; prefer [`MonotonicClock`] unless windows must line up
/// with calendar time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time. Sleeping on a `ManualClock` advances it
/// instead of blocking, which makes retry loops deterministic.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    /// Create a clock reading `start`.
    pub fn new(start: f64) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Jump to `now`.
    pub fn set(&self, now: f64) {
        *self.now.lock() = now;
    }

    /// Move forward by `seconds`.
    pub fn advance(&self, seconds: f64) {
        *self.now.lock() += seconds;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}

/// Blocks the current caller for a while.
pub trait Sleep: Send + Sync {
    /// Wait for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Sleeps with [`std::thread::sleep`], suspending only the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl Sleep for ManualClock {
    fn sleep(&self, duration: Duration) {
        self.advance(duration.as_secs_f64());
    }
}
