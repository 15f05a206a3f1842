//! # Error Taxonomy for Backend Calls
//!
//! Every network operation resolves into one of five variants so callers can
//! branch on the failure class instead of parsing message strings:
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | `NotFound` | Single lookup missed, or a batch range held no projects |
//! | `Transport` | Backend unreachable, connection reset, malformed body |
//! | `Validation` | Rejected client-side before any request was issued |
//! | `RateLimited` | HTTP 429 from the bid-placement backend, with retry hint |
//! | `Backend` | Any other non-2xx reply, message lifted from the error body |
//!
//! Batch-scan failures additionally carry the cursor diagnostics the backend
//! includes in its error payload (`last_checked_id`, `checked_ids`), because
//! the scan controller keeps walking past sparse ID ranges by advancing the
//! cursor even on failure.
//!
//! Nothing here is fatal: every failure is scoped to the operation that
//! triggered it and leaves prior state intact.

use thiserror::Error;

/// Failure classes for marketplace backend calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested project or range does not exist or is not accessible.
    #[error("{0}")]
    NotFound(String),

    /// Network-level failure: unreachable backend, timeout, bad body.
    #[error("transport error: {0}")]
    Transport(String),

    /// Rejected before any request was issued (invalid ID, amount below
    /// minimum, missing required selection).
    #[error("{0}")]
    Validation(String),

    /// HTTP 429 from the backend. `retry_after_secs` comes from the
    /// `Retry-After` header when present.
    #[error("rate limited, retry in {}s", retry_after_secs.unwrap_or(0))]
    RateLimited { retry_after_secs: Option<u64> },

    /// Any other non-2xx status, with the `error` field from the body when
    /// the backend supplied one.
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// A failed batch scan. Wraps the failure class together with whatever
/// cursor diagnostics the backend reported, so the controller can keep the
/// scan continuable past a gap of missing IDs.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct ScanFailure {
    pub kind: ApiError,
    /// Highest/lowest ID the backend actually probed before failing.
    pub last_checked_id: Option<u64>,
    /// IDs probed during the failed batch, for diagnostics.
    pub checked_ids: Vec<u64>,
}

impl ScanFailure {
    pub fn new(kind: ApiError) -> Self {
        ScanFailure {
            kind,
            last_checked_id: None,
            checked_ids: Vec::new(),
        }
    }
}

impl From<ApiError> for ScanFailure {
    fn from(kind: ApiError) -> Self {
        ScanFailure::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_display_includes_hint() {
        let err = ApiError::RateLimited {
            retry_after_secs: Some(12),
        };
        assert_eq!(err.to_string(), "rate limited, retry in 12s");
    }

    #[test]
    fn rate_limited_display_without_hint() {
        let err = ApiError::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(err.to_string(), "rate limited, retry in 0s");
    }

    #[test]
    fn scan_failure_displays_inner_kind() {
        let failure = ScanFailure {
            kind: ApiError::not_found("No projects found in this ID range"),
            last_checked_id: Some(1050),
            checked_ids: vec![1001, 1002],
        };
        assert_eq!(failure.to_string(), "No projects found in this ID range");
        assert!(failure.kind.is_not_found());
    }
}
