use std::{convert::Infallible, time::Duration};

use super::support::{Invocations, UpstreamError, UpstreamErrorKind};
use crate::{
    Clock, ExhaustionPolicy, GateError, KeyedRateLimitGate, MaxRetries, PeriodSeconds,
    RateLimitExceeded, RateLimitGate, RateLimitGateOptions, SleepAndRetry, SleepAndRetryOptions,
    sleep_and_retry_async,
};

// Reads tokio's clock so paused tests see time advance across sleeps.
fn tokio_clock() -> impl Clock {
    let origin = tokio::time::Instant::now();
    move || origin.elapsed().as_secs_f64()
}

fn gate(calls: u64, period: f64) -> RateLimitGate<UpstreamErrorKind, impl Clock> {
    RateLimitGate::with_clock(
        RateLimitGateOptions::default()
            .with_calls(calls)
            .with_period(PeriodSeconds::try_from(period).unwrap())
            .wrap_exception(UpstreamErrorKind::QuotaExhausted),
        tokio_clock(),
    )
}

#[tokio::test]
async fn call_async_awaits_outside_the_window_lock() {
    let gate = gate(2, 60.0);
    let inner_gate = &gate;

    let outer = gate
        .call_async(|| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let inner = inner_gate
                .call_async(|| async { Ok::<_, UpstreamError>("inner") })
                .await;
            Ok::<_, UpstreamError>(inner.unwrap())
        })
        .await;

    assert_eq!(outer.unwrap(), Some(Some("inner")));
    assert!(
        gate.call_async(|| async { Ok::<_, UpstreamError>(()) })
            .await
            .unwrap_err()
            .is_rate_limited()
    );
}

#[tokio::test]
async fn call_async_remaps_wrapped_kinds() {
    let gate = gate(5, 60.0);

    let result = gate
        .call_async(|| async {
            Err::<(), _>(UpstreamError::new(UpstreamErrorKind::QuotaExhausted, "quota"))
        })
        .await;

    assert_eq!(result.unwrap_err().rate_limited().unwrap().message, "quota");
}

#[tokio::test(start_paused = true)]
async fn sleep_and_retry_async_waits_for_the_window() {
    let gate = gate(1, 30.0);
    let started = tokio::time::Instant::now();

    assert!(gate.call(|| Ok::<_, UpstreamError>(())).is_ok());

    let gate = &gate;
    let value = sleep_and_retry_async(move || {
        gate.call_async(|| async { Ok::<_, UpstreamError>("second") })
    })
    .await;

    assert_eq!(value.unwrap(), Some("second"));
    assert!(started.elapsed() >= Duration::from_secs(29));
}

#[tokio::test(start_paused = true)]
async fn bounded_call_async_exhausts_silently() {
    let retrier = SleepAndRetry::new(SleepAndRetryOptions {
        max_retries: MaxRetries::from(2_u32),
        on_exhausted: ExhaustionPolicy::ReturnNone,
    });
    let invocations = Invocations::default();
    let invocations = &invocations;
    let started = tokio::time::Instant::now();

    let result = retrier
        .call_async(move || async move {
            invocations.hit();
            Err::<Option<()>, GateError<Infallible>>(RateLimitExceeded::new("busy", 1.0).into())
        })
        .await;

    assert!(matches!(result, Ok(None)));
    assert_eq!(invocations.count(), 2);
    assert!(started.elapsed() >= Duration::from_secs(2));
}

#[tokio::test]
async fn keyed_call_async_limits_per_key() {
    let gate = KeyedRateLimitGate::<&'static str>::new(
        RateLimitGateOptions::default().with_calls(1),
    );

    let first = gate.call_async(&"a", || async { Ok::<_, Infallible>(1) }).await;
    let second = gate.call_async(&"a", || async { Ok::<_, Infallible>(2) }).await;
    let other = gate.call_async(&"b", || async { Ok::<_, Infallible>(3) }).await;

    assert_eq!(first.unwrap(), Some(1));
    assert!(second.unwrap_err().is_rate_limited());
    assert_eq!(other.unwrap(), Some(3));
}
