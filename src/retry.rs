//! Sleep-and-retry wrappers for gated calls.
//!
//! Both retriers treat [`GateError::RateLimited`] as the only recoverable
//! failure: they wait for [`RateLimitExceeded::retry_after`] and call again.
//! [`GateError::Inner`] errors end the call immediately and are never retried.

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use tracing::{debug, warn};

use crate::{GateError, MaxRetries, RateLimitExceeded, Sleep, ThreadSleep};

/// Call `f` until it stops being rate limited, sleeping the current thread for
/// the signalled remaining time between attempts.
///
/// There is no attempt limit; the loop ends on success or on an inner error.
///
/// ```
/// use std::convert::Infallible;
///
/// use callgate::{RateLimitGate, RateLimitGateOptions, sleep_and_retry};
///
/// let gate = RateLimitGate::new(RateLimitGateOptions::default());
///
/// let value = sleep_and_retry(|| gate.call(|| Ok::<_, Infallible>(7))).unwrap();
/// assert_eq!(value, Some(7));
/// ```
pub fn sleep_and_retry<T, E, F>(f: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, GateError<E>>,
{
    sleep_and_retry_with(&ThreadSleep, f)
}

/// [`sleep_and_retry`] waiting through `sleeper` instead of the thread.
pub fn sleep_and_retry_with<T, E, F, S>(sleeper: &S, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, GateError<E>>,
    S: Sleep + ?Sized,
{
    loop {
        match f() {
            Ok(value) => return Ok(value),
            Err(GateError::RateLimited(exceeded)) => {
                debug!(
                    period_remaining = exceeded.period_remaining,
                    "rate limited, sleeping before retry"
                );

                sleeper.sleep(exceeded.retry_after());
            }
            Err(GateError::Inner(err)) => return Err(err),
        }
    }
}

/// Wrap `f` so every invocation goes through [`sleep_and_retry`].
///
/// Arguments are passed as one value and cloned for each attempt. Composes
/// with [`RateLimitGate::decorate`](crate::RateLimitGate::decorate):
///
/// ```
/// use std::{io, sync::Arc};
///
/// use callgate::{RateLimitGate, RateLimitGateOptions, sleep_and_retry_fn};
///
/// let gate = Arc::new(RateLimitGate::new(RateLimitGateOptions::<io::ErrorKind>::default()));
/// let add = sleep_and_retry_fn(gate.decorate(|(a, b): (i32, i32)| Ok::<_, io::Error>(a + b)));
///
/// assert_eq!(add((1, 2)).unwrap(), Some(3));
/// ```
pub fn sleep_and_retry_fn<A, T, E, F>(f: F) -> impl Fn(A) -> Result<T, E>
where
    A: Clone,
    F: Fn(A) -> Result<T, GateError<E>>,
{
    move |args| sleep_and_retry(|| f(args.clone()))
}

/// Async [`sleep_and_retry`], waiting with [`tokio::time::sleep`].
#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub async fn sleep_and_retry_async<T, E, F, Fut>(mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, GateError<E>>>,
{
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(GateError::RateLimited(exceeded)) => {
                debug!(
                    period_remaining = exceeded.period_remaining,
                    "rate limited, sleeping before retry"
                );

                tokio::time::sleep(exceeded.retry_after()).await;
            }
            Err(GateError::Inner(err)) => return Err(err),
        }
    }
}

/// What [`SleepAndRetry`] returns once its retries run out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExhaustionPolicy {
    /// Return `Ok(None)`, indistinguishable from a skipped call.
    #[default]
    ReturnNone,
    /// Return the last refusal as [`GateError::RateLimited`].
    Raise,
}

/// Configuration for [`SleepAndRetry`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepAndRetryOptions {
    /// Consecutive refusals tolerated before giving up. Defaults to 5.
    pub max_retries: MaxRetries,
    /// Result once `max_retries` is reached. Defaults to
    /// [`ExhaustionPolicy::ReturnNone`].
    pub on_exhausted: ExhaustionPolicy,
}

/// Bounded sleep-and-retry.
///
/// The retry counter belongs to the retrier, not to a single call: it counts
/// consecutive refusals across every call made through this value and is
/// reset only by a success (or [`reset`](Self::reset)). Once it reaches
/// `max_retries`, further calls do not invoke the function at all and return
/// according to [`ExhaustionPolicy`], which by default is a silent `Ok(None)`.
///
/// Concurrent callers share the counter. It is atomic, but one caller's
/// refusals still count against another caller's budget.
pub struct SleepAndRetry<S: Sleep = ThreadSleep> {
    max_retries: MaxRetries,
    on_exhausted: ExhaustionPolicy,
    retries: AtomicU32,
    sleeper: S,
}

impl SleepAndRetry<ThreadSleep> {
    /// Create a retrier that sleeps the calling thread.
    pub fn new(options: SleepAndRetryOptions) -> Self {
        Self::with_sleeper(options, ThreadSleep)
    }
}

impl Default for SleepAndRetry<ThreadSleep> {
    fn default() -> Self {
        Self::new(SleepAndRetryOptions::default())
    }
}

impl<S: Sleep> SleepAndRetry<S> {
    /// Create a retrier that waits through `sleeper`.
    pub fn with_sleeper(options: SleepAndRetryOptions, sleeper: S) -> Self {
        Self {
            max_retries: options.max_retries,
            on_exhausted: options.on_exhausted,
            retries: AtomicU32::new(0),
            sleeper,
        }
    } // end constructor

    /// Consecutive refusals recorded so far.
    pub fn retries(&self) -> u32 {
        self.retries.load(Ordering::Acquire)
    }

    /// Configured bound.
    pub fn max_retries(&self) -> MaxRetries {
        self.max_retries
    }

    /// Clear the retry counter.
    pub fn reset(&self) {
        self.retries.store(0, Ordering::Release);
    }

    /// Call `f`, absorbing up to `max_retries` consecutive refusals.
    ///
    /// `Ok(None)` from `f` (a refused call with `raise_on_limit` disabled)
    /// counts as a success.
    pub fn call<T, E, F>(&self, mut f: F) -> Result<Option<T>, GateError<E>>
    where
        F: FnMut() -> Result<Option<T>, GateError<E>>,
    {
        let mut last_refusal = None;

        while self.retries() < *self.max_retries {
            match f() {
                Ok(value) => {
                    self.reset();
                    return Ok(value);
                }
                Err(GateError::RateLimited(exceeded)) => {
                    self.sleeper.sleep(self.record_refusal(&exceeded));
                    last_refusal = Some(exceeded);
                }
                Err(err) => return Err(err),
            }
        }

        self.exhausted(last_refusal)
    } // end method call

    /// Wrap `f` so every invocation goes through [`call`](Self::call).
    ///
    /// Arguments are passed as one value and cloned for each attempt. All
    /// invocations of the returned closure share this retrier's counter.
    pub fn decorate<A, T, E, F>(
        self: Arc<Self>,
        f: F,
    ) -> impl Fn(A) -> Result<Option<T>, GateError<E>>
    where
        A: Clone,
        F: Fn(A) -> Result<Option<T>, GateError<E>>,
    {
        move |args| self.call(|| f(args.clone()))
    }

    /// Async [`call`](Self::call), waiting with [`tokio::time::sleep`].
    #[cfg(feature = "tokio")]
    #[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
    pub async fn call_async<T, E, F, Fut>(&self, mut f: F) -> Result<Option<T>, GateError<E>>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<Option<T>, GateError<E>>>,
    {
        let mut last_refusal = None;

        while self.retries() < *self.max_retries {
            match f().await {
                Ok(value) => {
                    self.reset();
                    return Ok(value);
                }
                Err(GateError::RateLimited(exceeded)) => {
                    tokio::time::sleep(self.record_refusal(&exceeded)).await;
                    last_refusal = Some(exceeded);
                }
                Err(err) => return Err(err),
            }
        }

        self.exhausted(last_refusal)
    } // end method call_async

    fn record_refusal(&self, exceeded: &RateLimitExceeded) -> std::time::Duration {
        let retries = self.retries.fetch_add(1, Ordering::AcqRel).saturating_add(1);

        debug!(
            retries,
            max_retries = *self.max_retries,
            period_remaining = exceeded.period_remaining,
            "rate limited, sleeping before retry"
        );

        exceeded.retry_after()
    }

    fn exhausted<T, E>(
        &self,
        last_refusal: Option<RateLimitExceeded>,
    ) -> Result<Option<T>, GateError<E>> {
        warn!(
            max_retries = *self.max_retries,
            policy = ?self.on_exhausted,
            "retries exhausted"
        );

        match self.on_exhausted {
            ExhaustionPolicy::ReturnNone => Ok(None),
            ExhaustionPolicy::Raise => Err(last_refusal
                .unwrap_or_else(|| RateLimitExceeded::new("retries exhausted", 0.0))
                .into()),
        }
    }
} // end of impl
