//! # Error Taxonomy
//!
//! The engine-wide error classes every operation resolves to at the
//! service boundary. Crate-local errors (escrow, voucher, dispute,
//! gateway) carry the precise state context and convert into these
//! classes where the caller sees them.
//!
//! ## Classes
//!
//! - `Validation` — malformed input, rejected before any mutation.
//! - `StateConflict` — a legal request against the wrong state; the
//!   aggregate is unchanged and the message names the conflict.
//! - `Provider` — classified gateway failure; drives the polling
//!   reconciliation path instead of failing the user operation outright.
//! - `Signature` — webhook verification failure; rejected before any
//!   processing and flagged for security review.
//! - `Consistency` — a data-model invariant would break. Never reachable
//!   in normal operation; fatal, logged, no silent repair.

use thiserror::Error;

/// Top-level error type for settlement operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed input, rejected pre-mutation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Invalid transition, duplicate escrow, over-release, expired or
    /// exhausted voucher. The aggregate is unchanged.
    #[error("state conflict: {0}")]
    StateConflict(String),

    /// The referenced aggregate does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The acting user is not eligible per the identity collaborator.
    #[error("user not eligible: {0}")]
    UserNotEligible(String),

    /// Classified external provider failure.
    #[error("external provider error: {0}")]
    Provider(String),

    /// Webhook signature verification failure.
    #[error("signature rejected: {0}")]
    Signature(String),

    /// A data-model invariant would break. Fatal.
    #[error("consistency violation: {0}")]
    Consistency(String),
}

impl EngineError {
    /// Whether this error indicates corrupted state rather than a bad request.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Consistency(_))
    }
}
