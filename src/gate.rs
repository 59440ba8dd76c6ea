use std::{collections::HashSet, future::Future, hash::Hash, sync::Arc};

use tracing::debug;

use crate::{
    CallLimit, Clock, ErrorKind, FixedWindow, GateError, MonotonicClock, PeriodSeconds,
    RateLimitExceeded, WindowDecision,
};

/// Message carried by refusals that come from the window itself.
pub const TOO_MANY_CALLS: &str = "too many calls";

/// Configuration for [`RateLimitGate`] and [`KeyedRateLimitGate`](crate::KeyedRateLimitGate).
#[derive(Clone, Debug)]
pub struct RateLimitGateOptions<K = ()> {
    /// Calls permitted per window. Defaults to 15.
    pub calls: CallLimit,
    /// Window length. Defaults to 900 seconds.
    pub period: PeriodSeconds,
    /// When `false`, a refused call returns `Ok(None)` instead of an error.
    pub raise_on_limit: bool,
    /// Error kinds that, when returned by the callee, are reported as
    /// [`GateError::RateLimited`] instead of [`GateError::Inner`].
    pub wrap_exceptions: HashSet<K>,
}

impl<K> Default for RateLimitGateOptions<K> {
    fn default() -> Self {
        Self {
            calls: CallLimit::default(),
            period: PeriodSeconds::default(),
            raise_on_limit: true,
            wrap_exceptions: HashSet::new(),
        }
    }
}

impl<K: Eq + Hash> RateLimitGateOptions<K> {
    /// Set the number of calls per window.
    pub fn with_calls(mut self, calls: u64) -> Self {
        self.calls = CallLimit::new(calls);
        self
    }

    /// Set the window length.
    pub fn with_period(mut self, period: PeriodSeconds) -> Self {
        self.period = period;
        self
    }

    /// Choose between raising and silently skipping refused calls.
    pub fn with_raise_on_limit(mut self, raise_on_limit: bool) -> Self {
        self.raise_on_limit = raise_on_limit;
        self
    }

    /// Treat callee errors of `kind` as quota exhaustion.
    pub fn wrap_exception(mut self, kind: K) -> Self {
        self.wrap_exceptions.insert(kind);
        self
    }
}

/// What a gate does with a refusal or a callee error. Shared by the single
/// and keyed gates.
#[derive(Debug)]
pub(crate) struct GatePolicy<K> {
    raise_on_limit: bool,
    wrapped_exceptions: HashSet<K>,
}

impl<K: Eq + Hash> GatePolicy<K> {
    pub(crate) fn new(raise_on_limit: bool, wrapped_exceptions: HashSet<K>) -> Self {
        Self {
            raise_on_limit,
            wrapped_exceptions,
        }
    }

    pub(crate) fn refuse<T, E>(&self, remaining_seconds: f64) -> Result<Option<T>, GateError<E>> {
        if !self.raise_on_limit {
            debug!(remaining_seconds, "call skipped, rate limit reached");
            return Ok(None);
        }

        debug!(remaining_seconds, "call refused, rate limit reached");
        Err(RateLimitExceeded::new(TOO_MANY_CALLS, remaining_seconds).into())
    }

    /// Maps `err` to a refusal when its kind is wrapped. The remaining time is
    /// re-read from `window` without counting another attempt.
    pub(crate) fn remap<E, C>(&self, err: E, window: &FixedWindow<C>) -> GateError<E>
    where
        E: ErrorKind<Kind = K>,
        C: Clock,
    {
        if self.wrapped_exceptions.is_empty() || !self.wrapped_exceptions.contains(&err.kind()) {
            return GateError::Inner(err);
        }

        let period_remaining = window.period_remaining();
        debug!(error = %err, period_remaining, "callee error mapped to rate limit");

        GateError::RateLimited(RateLimitExceeded::new(err.to_string(), period_remaining))
    }

    pub(crate) fn admit<T, E, C>(
        &self,
        window: &FixedWindow<C>,
    ) -> Option<Result<Option<T>, GateError<E>>>
    where
        C: Clock,
    {
        match window.attempt() {
            WindowDecision::Permitted => None,
            WindowDecision::Refused { remaining_seconds } => Some(self.refuse(remaining_seconds)),
        }
    }
}

/// Throttles calls to any closure with one [`FixedWindow`].
///
/// Every call goes through [`FixedWindow::attempt`] first. Permitted calls run
/// outside the window lock, so a callee may take as long as it likes or call
/// back into the same gate.
///
/// Results are `Ok(Some(value))` on success and `Ok(None)` when the call was
/// refused with `raise_on_limit` disabled. Refusals otherwise surface as
/// [`GateError::RateLimited`], as do callee errors whose [`ErrorKind::kind`]
/// is listed in `wrap_exceptions`. Every other callee error comes back as
/// [`GateError::Inner`], unchanged.
///
/// # Examples
///
/// ```
/// use std::convert::Infallible;
///
/// use callgate::{GateError, ManualClock, PeriodSeconds, RateLimitGate, RateLimitGateOptions};
///
/// let clock = ManualClock::new(0.0);
/// let gate = RateLimitGate::with_clock(
///     RateLimitGateOptions::default()
///         .with_calls(2)
///         .with_period(PeriodSeconds::try_from(60.0).unwrap()),
///     clock.clone(),
/// );
///
/// let ping = || Ok::<_, Infallible>("pong");
///
/// assert_eq!(gate.call(ping).unwrap(), Some("pong"));
/// assert_eq!(gate.call(ping).unwrap(), Some("pong"));
///
/// clock.set(10.0);
/// let Err(GateError::RateLimited(exceeded)) = gate.call(ping) else {
///     panic!("expected a refusal");
/// };
/// assert_eq!(exceeded.period_remaining, 50.0);
///
/// clock.set(61.0);
/// assert_eq!(gate.call(ping).unwrap(), Some("pong"));
/// ```
pub struct RateLimitGate<K = (), C: Clock = MonotonicClock> {
    window: FixedWindow<C>,
    policy: GatePolicy<K>,
}

impl<K: Eq + Hash> RateLimitGate<K, MonotonicClock> {
    /// Create a gate reading time from a fresh [`MonotonicClock`].
    pub fn new(options: RateLimitGateOptions<K>) -> Self {
        Self::with_clock(options, MonotonicClock::new())
    }
}

impl<K: Eq + Hash, C: Clock> RateLimitGate<K, C> {
    /// Create a gate reading time from `clock`.
    pub fn with_clock(options: RateLimitGateOptions<K>, clock: C) -> Self {
        Self {
            window: FixedWindow::new(options.calls, options.period, clock),
            policy: GatePolicy::new(options.raise_on_limit, options.wrap_exceptions),
        }
    }

    /// The window backing this gate.
    pub fn window(&self) -> &FixedWindow<C> {
        &self.window
    }

    /// Run `f` if the window permits it.
    pub fn call<T, E, F>(&self, f: F) -> Result<Option<T>, GateError<E>>
    where
        F: FnOnce() -> Result<T, E>,
        E: ErrorKind<Kind = K>,
    {
        if let Some(refused) = self.policy.admit(&self.window) {
            return refused;
        }

        f().map(Some).map_err(|err| self.policy.remap(err, &self.window))
    }

    /// Run the future produced by `f` if the window permits it.
    ///
    /// The window lock is released before the future is polled.
    pub async fn call_async<T, E, F, Fut>(&self, f: F) -> Result<Option<T>, GateError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ErrorKind<Kind = K>,
    {
        if let Some(refused) = self.policy.admit(&self.window) {
            return refused;
        }

        f().await
            .map(Some)
            .map_err(|err| self.policy.remap(err, &self.window))
    }

    /// Wrap `f` so every invocation goes through this gate.
    ///
    /// Arguments are passed as one value, typically a tuple, so any arity works.
    ///
    /// ```
    /// use std::{io, sync::Arc};
    ///
    /// use callgate::{RateLimitGate, RateLimitGateOptions};
    ///
    /// let gate = Arc::new(RateLimitGate::new(
    ///     RateLimitGateOptions::<io::ErrorKind>::default().with_calls(1),
    /// ));
    /// let add = gate.decorate(|(a, b): (i32, i32)| Ok::<_, io::Error>(a + b));
    ///
    /// assert_eq!(add((1, 2)).unwrap(), Some(3));
    /// assert!(add((3, 4)).unwrap_err().is_rate_limited());
    /// ```
    pub fn decorate<A, T, E, F>(
        self: Arc<Self>,
        f: F,
    ) -> impl Fn(A) -> Result<Option<T>, GateError<E>>
    where
        F: Fn(A) -> Result<T, E>,
        E: ErrorKind<Kind = K>,
    {
        move |args| self.call(|| f(args))
    }
} // end of impl
