use std::time::Duration;

use crate::{CallLimit, CallgateError, MaxRetries, PeriodSeconds, RateLimitExceeded};

#[test]
fn call_limit_clamped_floors_fractions() {
    assert_eq!(*CallLimit::clamped(2.9), 2);
    assert_eq!(*CallLimit::clamped(1.0), 1);
    assert_eq!(*CallLimit::clamped(15.5), 15);
}

#[test]
fn call_limit_clamped_raises_sub_one_values_to_one() {
    assert_eq!(*CallLimit::clamped(0.0), 1);
    assert_eq!(*CallLimit::clamped(0.99), 1);
    assert_eq!(*CallLimit::clamped(-3.0), 1);
    assert_eq!(*CallLimit::clamped(f64::NAN), 1);
    assert_eq!(*CallLimit::clamped(f64::NEG_INFINITY), 1);
}

#[test]
fn call_limit_clamped_saturates_at_max() {
    assert_eq!(CallLimit::clamped(f64::INFINITY), CallLimit::max());
    assert_eq!(CallLimit::clamped(1e30), CallLimit::max());
}

#[test]
fn call_limit_from_integer_is_at_least_one() {
    assert_eq!(*CallLimit::from(0_u64), 1);
    assert_eq!(*CallLimit::new(7), 7);
    assert_eq!(*CallLimit::default(), 15);
}

#[test]
fn period_seconds_try_from_validates_positive() {
    let p = PeriodSeconds::try_from(0.25).unwrap();
    assert_eq!(*p, 0.25);
    assert_eq!(p.as_duration(), Duration::from_millis(250));

    assert_eq!(
        PeriodSeconds::try_from(0.0).unwrap_err(),
        CallgateError::InvalidPeriod("Period must be greater than 0".to_string())
    );
    assert_eq!(
        PeriodSeconds::try_from(-1.0).unwrap_err(),
        CallgateError::InvalidPeriod("Period must be greater than 0".to_string())
    );
    assert!(matches!(
        PeriodSeconds::try_from(f64::NAN),
        Err(CallgateError::InvalidPeriod(_))
    ));
    assert!(matches!(
        PeriodSeconds::try_from(f64::INFINITY),
        Err(CallgateError::InvalidPeriod(_))
    ));

    assert_eq!(*PeriodSeconds::default(), 900.0);
    assert_eq!(
        *PeriodSeconds::try_from(Duration::from_secs(60)).unwrap(),
        60.0
    );
}

#[test]
fn max_retries_defaults_to_five() {
    assert_eq!(*MaxRetries::default(), 5);
    assert_eq!(*MaxRetries::from(0_u32), 0);
}

#[test]
fn retry_after_clamps_negative_remaining_to_zero() {
    assert_eq!(
        RateLimitExceeded::new("late", -3.5).retry_after(),
        Duration::ZERO
    );
    assert_eq!(
        RateLimitExceeded::new("nan", f64::NAN).retry_after(),
        Duration::ZERO
    );
    assert_eq!(
        RateLimitExceeded::new("soon", 1.5).retry_after(),
        Duration::from_millis(1500)
    );
}

#[test]
fn rate_limit_exceeded_displays_its_message() {
    let exceeded = RateLimitExceeded::new("too many calls", 12.0);
    assert_eq!(exceeded.to_string(), "too many calls");
}
