//! Top-level error type shared across crates.

use thiserror::Error;

use crate::ChallengeStatus;

/// Common error type for StreakDuel domain values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DuelError {
    #[error("{0} must not be empty")]
    EmptyId(&'static str),

    #[error("unknown challenge status: {0}")]
    UnknownStatus(String),

    #[error("illegal status transition {from} -> {to}")]
    IllegalTransition {
        from: ChallengeStatus,
        to: ChallengeStatus,
    },

    #[error("{0}")]
    Other(String),
}
