#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod clock;
pub use clock::*;

mod common;
pub use common::{CallLimit, MaxRetries, PeriodSeconds, WindowDecision};

mod error;
pub use error::*;

mod window;
pub use window::*;

mod gate;
pub use gate::{RateLimitGate, RateLimitGateOptions, TOO_MANY_CALLS};

mod keyed;
pub use keyed::*;

mod retry;
pub use retry::*;

#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
mod config;
#[cfg(feature = "serde")]
pub use config::*;

#[cfg(test)]
mod tests;
