use parking_lot::Mutex;
use tracing::trace;

use crate::{CallLimit, Clock, MonotonicClock, PeriodSeconds, WindowDecision};

struct WindowState {
    window_start: f64,
    call_count: u64,
}

/// Fixed-window call counter.
///
/// Counts attempts since the start of the current window and refuses every
/// attempt past `limit` until `period` seconds have elapsed, at which point the
/// count drops back to zero in one step. There is no smoothing between windows.
///
/// # Thread Safety
///
/// The whole read, reset, increment and compare sequence of [`attempt`](Self::attempt)
/// runs under one lock owned by this window, so two threads can never both take
/// the last slot. The lock is never held outside the methods of this type.
///
/// # Counting refused attempts
///
/// A refused attempt still increments the count. Once a window is
/// over-subscribed it stays that way until it resets, and each further refusal
/// reports a smaller remaining time.
///
/// # Examples
///
/// ```
/// use callgate::{CallLimit, FixedWindow, ManualClock, PeriodSeconds, WindowDecision};
///
/// let clock = ManualClock::new(0.0);
/// let window = FixedWindow::new(
///     CallLimit::new(1),
///     PeriodSeconds::try_from(60.0).unwrap(),
///     clock.clone(),
/// );
///
/// assert!(window.attempt().is_permitted());
///
/// clock.set(10.0);
/// assert_eq!(
///     window.attempt(),
///     WindowDecision::Refused { remaining_seconds: 50.0 }
/// );
/// ```
pub struct FixedWindow<C: Clock = MonotonicClock> {
    limit: CallLimit,
    period: PeriodSeconds,
    clock: C,
    state: Mutex<WindowState>,
}

impl<C: Clock> FixedWindow<C> {
    /// Create a window that starts now, according to `clock`.
    pub fn new(limit: CallLimit, period: PeriodSeconds, clock: C) -> Self {
        let window_start = clock.now();

        Self {
            limit,
            period,
            clock,
            state: Mutex::new(WindowState {
                window_start,
                call_count: 0,
            }),
        }
    } // end constructor

    /// Record an attempt and decide whether it may proceed.
    ///
    /// 1. Compute the time left in the current window.
    /// 2. If none is left, start a new window now with a zero count.
    /// 3. Count the attempt.
    /// 4. Refuse if the count is past the limit, with the time left.
    pub fn attempt(&self) -> WindowDecision {
        let mut state = self.state.lock();

        let mut remaining_seconds = self.remaining(&state);

        if remaining_seconds <= 0.0 {
            state.call_count = 0;
            state.window_start = self.clock.now();
            remaining_seconds = *self.period;

            trace!(window_start = state.window_start, "window reset");
        }

        state.call_count = state.call_count.saturating_add(1);

        if state.call_count > *self.limit {
            trace!(
                call_count = state.call_count,
                limit = *self.limit,
                remaining_seconds,
                "window full"
            );

            return WindowDecision::Refused { remaining_seconds };
        }

        WindowDecision::Permitted
    } // end method attempt

    /// Seconds left in the current window. Does not count an attempt or reset
    /// the window, so the result is negative once the window is stale.
    pub fn period_remaining(&self) -> f64 {
        let state = self.state.lock();
        self.remaining(&state)
    }

    /// Attempts counted in the current window, refused ones included.
    pub fn call_count(&self) -> u64 {
        self.state.lock().call_count
    }

    /// Clock reading at the start of the current window.
    pub fn window_start(&self) -> f64 {
        self.state.lock().window_start
    }

    /// Configured limit.
    pub fn limit(&self) -> CallLimit {
        self.limit
    }

    /// Configured period.
    pub fn period(&self) -> PeriodSeconds {
        self.period
    }

    /// The clock this window reads.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn remaining(&self, state: &WindowState) -> f64 {
        *self.period - (self.clock.now() - state.window_start)
    }
} // end of impl
