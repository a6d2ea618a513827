//! # fundi-dispute — Dispute Resolution
//!
//! The out-of-band process that can override an escrow's default
//! release path:
//!
//! - **Dispute** (`dispute.rs`): lifecycle state machine
//!   (OPEN → IN_MEDIATION → IN_ARBITRATION → RESOLVED → CLOSED), the
//!   ordered append-only mediation log, evidence, and the
//!   `ArbitrationDecision` vocabulary.
//!
//! ## Crate Policy
//!
//! No escrow or ledger access. The dispute records the ruling and
//! guards the one-shot resolution gate; executing the ruling against an
//! escrow belongs to `fundi-settlement`.

pub mod dispute;

pub use dispute::{
    ArbitrationDecision, ArbitrationRuling, Dispute, DisputeError, DisputeKind, DisputeStatus,
    DisputeTransition, Evidence, MediationMessage,
};
