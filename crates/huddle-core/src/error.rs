//! Layer 0: boundary validation errors.
//!
//! Only identity failures surface as errors: a record whose stable key is
//! unusable cannot be reconciled at all. Tolerated data anomalies
//! (out-of-range volume, negative timestamps, join-time regression) are
//! sanitized and logged instead, and contract violations fail fast.

use thiserror::Error;

/// Invalid identity value received at a boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidId {
    #[error("user id {raw} is invalid: {reason}")]
    User { raw: i64, reason: &'static str },
    #[error("audio source {raw} is invalid: {reason}")]
    AudioSource { raw: i32, reason: &'static str },
}

/// Canonical error enum for the core crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CoreError {
    #[error(transparent)]
    InvalidId(#[from] InvalidId),
}
