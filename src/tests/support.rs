use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum UpstreamErrorKind {
    QuotaExhausted,
    Throttled,
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub detail: &'static str,
}

impl UpstreamError {
    pub(super) fn new(kind: UpstreamErrorKind, detail: &'static str) -> Self {
        Self { kind, detail }
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.detail)
    }
}

impl ErrorKind for UpstreamError {
    type Kind = UpstreamErrorKind;

    fn kind(&self) -> Self::Kind {
        self.kind
    }
}

/// Counts how many times the wrapped body actually ran.
#[derive(Default)]
pub(super) struct Invocations(AtomicUsize);

impl Invocations {
    pub(super) fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(super) fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
