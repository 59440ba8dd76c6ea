use std::{ops::Deref, time::Duration};

use crate::CallgateError;

/// Maximum number of calls permitted within one window.
///
/// Always at least 1. Fractional values are rounded down, anything below 1
/// (including NaN) becomes 1 and anything past [`u64::MAX`] saturates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallLimit(u64);

impl CallLimit {
    /// `calls` per window, raised to 1 if zero.
    pub fn new(calls: u64) -> Self {
        Self(calls.max(1))
    }

    /// Floor `calls` and clamp it to `[1, u64::MAX]`.
    pub fn clamped(calls: f64) -> Self {
        // `as` saturates and maps NaN to 0.
        Self((calls.floor() as u64).max(1))
    }

    /// The largest representable limit.
    pub fn max() -> Self {
        Self(u64::MAX)
    }
}

impl Default for CallLimit {
    /// 15 calls per window.
    fn default() -> Self {
        Self(15)
    }
}

impl Deref for CallLimit {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<u64> for CallLimit {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

/// Length of a window in seconds. Strictly positive and finite.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct PeriodSeconds(f64);

impl PeriodSeconds {
    /// The period as a [`Duration`].
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs_f64(self.0)
    }
}

impl Default for PeriodSeconds {
    /// 900 seconds (15 minutes).
    fn default() -> Self {
        Self(900.0)
    }
}

impl Deref for PeriodSeconds {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<f64> for PeriodSeconds {
    type Error = CallgateError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            Err(CallgateError::InvalidPeriod(
                "Period must be a finite number of seconds".to_string(),
            ))
        } else if value <= 0.0 {
            Err(CallgateError::InvalidPeriod(
                "Period must be greater than 0".to_string(),
            ))
        } else {
            Ok(Self(value))
        }
    }
}

impl TryFrom<Duration> for PeriodSeconds {
    type Error = CallgateError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::try_from(value.as_secs_f64())
    }
}

/// Upper bound on consecutive refusals a [`SleepAndRetry`](crate::SleepAndRetry) absorbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaxRetries(u32);

impl Default for MaxRetries {
    /// 5 retries.
    fn default() -> Self {
        Self(5)
    }
}

impl Deref for MaxRetries {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<u32> for MaxRetries {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Outcome of a single [`FixedWindow::attempt`](crate::FixedWindow::attempt).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowDecision {
    /// The call fits in the current window.
    Permitted,
    /// The window is full.
    Refused {
        /// Seconds until the current window ends.
        remaining_seconds: f64,
    },
}

impl WindowDecision {
    /// `true` for [`WindowDecision::Permitted`].
    pub fn is_permitted(&self) -> bool {
        matches!(self, Self::Permitted)
    }
}
