use std::{
    hash::Hash,
    sync::{Arc, Weak},
    thread,
    time::Duration,
};

use dashmap::DashMap;
use tracing::trace;

use crate::{
    CallLimit, Clock, ErrorKind, FixedWindow, GateError, MonotonicClock, PeriodSeconds,
    RateLimitGateOptions, gate::GatePolicy,
};

/// One [`FixedWindow`] per key, all sharing the same options and clock.
///
/// Each key behaves exactly like its own [`RateLimitGate`](crate::RateLimitGate):
/// calls for `"a"` never consume slots of `"b"`.
///
/// # Memory growth
///
/// Keys are not removed automatically. Call [`cleanup`](Self::cleanup)
/// periodically, or start [`run_cleanup_loop`](Self::run_cleanup_loop), when
/// key cardinality is unbounded.
pub struct KeyedRateLimitGate<Q, K = (), C = MonotonicClock>
where
    Q: Eq + Hash,
    C: Clock + Clone,
{
    calls: CallLimit,
    period: PeriodSeconds,
    clock: C,
    policy: GatePolicy<K>,
    windows: DashMap<Q, Arc<FixedWindow<C>>>,
}

impl<Q, K> KeyedRateLimitGate<Q, K, MonotonicClock>
where
    Q: Eq + Hash + Clone,
    K: Eq + Hash,
{
    /// Create a keyed gate reading time from a fresh [`MonotonicClock`].
    pub fn new(options: RateLimitGateOptions<K>) -> Self {
        Self::with_clock(options, MonotonicClock::new())
    }
}

impl<Q, K, C> KeyedRateLimitGate<Q, K, C>
where
    Q: Eq + Hash + Clone,
    K: Eq + Hash,
    C: Clock + Clone,
{
    /// Create a keyed gate reading time from `clock`.
    pub fn with_clock(options: RateLimitGateOptions<K>, clock: C) -> Self {
        Self {
            calls: options.calls,
            period: options.period,
            clock,
            policy: GatePolicy::new(options.raise_on_limit, options.wrap_exceptions),
            windows: DashMap::new(),
        }
    } // end constructor

    /// Run `f` if the window for `key` permits it.
    ///
    /// Same contract as [`RateLimitGate::call`](crate::RateLimitGate::call).
    pub fn call<T, E, F>(&self, key: &Q, f: F) -> Result<Option<T>, GateError<E>>
    where
        F: FnOnce() -> Result<T, E>,
        E: ErrorKind<Kind = K>,
    {
        let window = self.window(key);

        if let Some(refused) = self.policy.admit(&window) {
            return refused;
        }

        f().map(Some).map_err(|err| self.policy.remap(err, &window))
    } // end method call

    /// Async counterpart of [`call`](Self::call).
    pub async fn call_async<T, E, F, Fut>(
        &self,
        key: &Q,
        f: F,
    ) -> Result<Option<T>, GateError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: ErrorKind<Kind = K>,
    {
        let window = self.window(key);

        if let Some(refused) = self.policy.admit(&window) {
            return refused;
        }

        f().await.map(Some).map_err(|err| self.policy.remap(err, &window))
    }

    /// The window for `key`, created on first use.
    ///
    /// The map entry is released before the window is returned, so holding
    /// the window never blocks other keys.
    pub fn window(&self, key: &Q) -> Arc<FixedWindow<C>> {
        if let Some(window) = self.windows.get(key) {
            return window.value().clone();
        }

        self.windows
            .entry(key.clone())
            .or_insert_with(|| {
                Arc::new(FixedWindow::new(self.calls, self.period, self.clock.clone()))
            })
            .value()
            .clone()
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// `true` when no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Forget `key`. Its next call starts a fresh window.
    pub fn remove(&self, key: &Q) -> bool {
        self.windows.remove(key).is_some()
    }

    /// Drop every key whose current window has expired and started more than
    /// `stale_after_seconds` ago.
    ///
    /// A live window is always kept, whatever the threshold, so cleanup never
    /// lets a key start a fresh window before its period has elapsed.
    pub fn cleanup(&self, stale_after_seconds: f64) {
        let now = self.clock.now();
        let before = self.windows.len();

        self.windows.retain(|_, window| {
            window.period_remaining() > 0.0 || now - window.window_start() <= stale_after_seconds
        });

        trace!(
            removed = before.saturating_sub(self.windows.len()),
            "keyed gate cleanup"
        );
    } // end method cleanup
}

impl<Q, K, C> KeyedRateLimitGate<Q, K, C>
where
    Q: Eq + Hash + Clone + Send + Sync + 'static,
    K: Eq + Hash + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    /// Run [`cleanup`](Self::cleanup) every `interval` on a background thread.
    ///
    /// The thread holds only a weak reference and exits once the last
    /// [`Arc`] to the gate is dropped.
    pub fn run_cleanup_loop(self: &Arc<Self>, interval: Duration, stale_after_seconds: f64) {
        let gate: Weak<Self> = Arc::downgrade(self);

        thread::spawn(move || {
            loop {
                thread::sleep(interval);

                let Some(gate) = gate.upgrade() else {
                    trace!("keyed gate dropped, stopping cleanup loop");
                    break;
                };

                gate.cleanup(stale_after_seconds);
            }
        });
    } // end method run_cleanup_loop
} // end of impl
