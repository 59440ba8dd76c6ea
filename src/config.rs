use serde::Deserialize;

use crate::{
    CallLimit, CallgateError, ExhaustionPolicy, MaxRetries, PeriodSeconds, RateLimitGateOptions,
    SleepAndRetryOptions,
};

/// Raw gate and retry settings, as found in a configuration file.
///
/// Missing fields take the same defaults as the options types.
///
/// ```
/// use callgate::GateConfig;
///
/// let config: GateConfig = toml::from_str("calls = 2\nperiod = 60.5").unwrap();
/// let options = config.gate_options::<()>().unwrap();
///
/// assert_eq!(*options.calls, 2);
/// assert_eq!(*options.period, 60.5);
/// assert!(options.raise_on_limit);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Calls per window; floored and clamped to at least 1.
    pub calls: f64,
    /// Window length in seconds.
    pub period: f64,
    /// See [`RateLimitGateOptions::raise_on_limit`].
    pub raise_on_limit: bool,
    /// See [`SleepAndRetryOptions::max_retries`].
    pub max_retries: u32,
    /// Return the last refusal instead of `Ok(None)` once retries run out.
    pub raise_on_exhausted: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            calls: *CallLimit::default() as f64,
            period: *PeriodSeconds::default(),
            raise_on_limit: true,
            max_retries: *MaxRetries::default(),
            raise_on_exhausted: false,
        }
    }
}

impl GateConfig {
    /// Validated gate options with no wrapped error kinds.
    pub fn gate_options<K>(&self) -> Result<RateLimitGateOptions<K>, CallgateError> {
        Ok(RateLimitGateOptions {
            calls: CallLimit::clamped(self.calls),
            period: PeriodSeconds::try_from(self.period)?,
            raise_on_limit: self.raise_on_limit,
            ..RateLimitGateOptions::default()
        })
    }

    /// Bounded retrier options.
    pub fn retry_options(&self) -> SleepAndRetryOptions {
        SleepAndRetryOptions {
            max_retries: MaxRetries::from(self.max_retries),
            on_exhausted: if self.raise_on_exhausted {
                ExhaustionPolicy::Raise
            } else {
                ExhaustionPolicy::ReturnNone
            },
        }
    }
}
