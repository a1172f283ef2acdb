//! Admission outcomes.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum DenyKind {
    /// Client exceeded its per-window quota.
    #[error("Too many requests. Please slow down.")]
    ClientRateLimited,

    /// Client exceeded the block threshold and is in cooldown.
    #[error("Too many requests. You have been temporarily blocked.")]
    ClientBlocked,

    /// Aggregate load exceeded the global quota. Same hint for every caller.
    #[error("Service is temporarily overloaded. Please try again later.")]
    GlobalOverloaded,
}

impl DenyKind {
    /// Metric label for this kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DenyKind::ClientRateLimited => "limited",
            DenyKind::ClientBlocked => "blocked",
            DenyKind::GlobalOverloaded => "overloaded",
        }
    }
}

/// A denied admission and when the caller may retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denial {
    pub kind: DenyKind,
    pub retry_after: Duration,
}

impl Denial {
    pub fn new(kind: DenyKind, retry_after: Duration) -> Self {
        Self { kind, retry_after }
    }

    /// Retry hint in whole seconds, rounded up.
    pub fn retry_after_secs(&self) -> u64 {
        ceil_secs(self.retry_after)
    }
}

pub(crate) fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (retry after {}s)", self.kind, self.retry_after_secs())
    }
}

impl std::error::Error for Denial {}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionResult {
    Allowed { requests_remaining: u64 },
    Denied(Denial),
}

impl AdmissionResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AdmissionResult::Allowed { .. })
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            AdmissionResult::Denied(denial) => Some(denial),
            AdmissionResult::Allowed { .. } => None,
        }
    }

    /// Convert into a `Result`, for callers that propagate denials with `?`.
    pub fn into_result(self) -> Result<u64, Denial> {
        match self {
            AdmissionResult::Allowed { requests_remaining } => Ok(requests_remaining),
            AdmissionResult::Denied(denial) => Err(denial),
        }
    }

    /// Metric label for this outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            AdmissionResult::Allowed { .. } => "allowed",
            AdmissionResult::Denied(denial) => denial.kind.as_str(),
        }
    }
}
