use std::{convert::Infallible, fmt::Display, hash::Hash, io, time::Duration};

/// Error type for invalid configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CallgateError {
    /// Invalid window period.
    #[error("invalid period: {0}")]
    InvalidPeriod(String),
}

/// A call was refused because its window is full, or the callee itself
/// reported quota exhaustion through a wrapped error kind.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct RateLimitExceeded {
    /// Human readable reason. `"too many calls"` for local refusals, the
    /// callee's error text for remapped errors.
    pub message: String,
    /// Seconds until the current window ends, measured when the refusal was
    /// raised. May be negative if the window was already stale.
    pub period_remaining: f64,
}

impl RateLimitExceeded {
    /// Create a new refusal.
    pub fn new(message: impl Into<String>, period_remaining: f64) -> Self {
        Self {
            message: message.into(),
            period_remaining,
        }
    }

    /// How long to wait before trying again. Negative remainders become zero.
    pub fn retry_after(&self) -> Duration {
        Duration::try_from_secs_f64(self.period_remaining.max(0.0)).unwrap_or(Duration::MAX)
    }
}

/// Failure of a gated call.
#[derive(Debug, thiserror::Error)]
pub enum GateError<E> {
    /// The gate refused the call, or the callee failed with a wrapped error kind.
    #[error("{0}")]
    RateLimited(#[from] RateLimitExceeded),
    /// The callee failed with an error that is not wrapped. Passed through untouched.
    #[error("{0}")]
    Inner(E),
}

impl<E> GateError<E> {
    /// The refusal, if this is one.
    pub fn rate_limited(&self) -> Option<&RateLimitExceeded> {
        match self {
            Self::RateLimited(exceeded) => Some(exceeded),
            Self::Inner(_) => None,
        }
    }

    /// `true` for [`GateError::RateLimited`].
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// The callee's own error, if this is one.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::RateLimited(_) => None,
            Self::Inner(err) => Some(err),
        }
    }
}

/// Classifies an error into a kind tag the gate can match against.
///
/// Matching is exact equality on [`ErrorKind::Kind`]; there is no notion of
/// one kind containing another. The [`Display`] text of a matched error
/// becomes the message of the resulting [`RateLimitExceeded`].
///
/// # Foreign error types
///
/// The orphan rule keeps callers from implementing this trait for error types
/// defined elsewhere, such as `String`, `Box<dyn Error>` or `anyhow::Error`.
/// Wrap them in a local newtype and gate the wrapped callable instead:
///
/// ```
/// use std::{error::Error, fmt};
///
/// use callgate::{ErrorKind, RateLimitGate, RateLimitGateOptions};
///
/// #[derive(Debug)]
/// struct Upstream(Box<dyn Error + Send + Sync>);
///
/// impl fmt::Display for Upstream {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "{}", self.0)
///     }
/// }
///
/// impl ErrorKind for Upstream {
///     type Kind = ();
///
///     fn kind(&self) -> Self::Kind {}
/// }
///
/// let gate = RateLimitGate::new(RateLimitGateOptions::default().wrap_exception(()));
/// let result = gate.call(|| Err::<(), _>(Upstream("quota exhausted".into())));
///
/// assert_eq!(result.unwrap_err().rate_limited().unwrap().message, "quota exhausted");
/// ```
pub trait ErrorKind: Display {
    /// Tag type, usually a fieldless enum.
    type Kind: Eq + Hash;

    /// The tag of this error.
    fn kind(&self) -> Self::Kind;
}

impl ErrorKind for io::Error {
    type Kind = io::ErrorKind;

    fn kind(&self) -> Self::Kind {
        io::Error::kind(self)
    }
}

impl ErrorKind for Infallible {
    type Kind = ();

    fn kind(&self) -> Self::Kind {
        match *self {}
    }
}
