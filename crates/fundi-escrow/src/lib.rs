//! # fundi-escrow — Escrow Aggregates
//!
//! The fund-holding side of the settlement engine:
//!
//! - **Escrow** (`escrow.rs`): the blocked deposit with labor and
//!   materials sub-balances, voucher reservations, and arbitration
//!   decision execution.
//!
//! - **Milestone** (`milestone.rs`): the validation state machine that
//!   authorizes labor releases, including the auto-validation window.
//!
//! - **Voucher** (`voucher.rs`): material vouchers redeemed at
//!   suppliers, with the per-attempt validation audit record.
//!
//! ## Crate Policy
//!
//! Pure aggregates: no locking, no ledger, no gateway calls. Every
//! mutation either completes or leaves the aggregate untouched, so the
//! settlement layer can hold one under a lock and record the ledger row
//! in the same critical section.

pub mod escrow;
pub mod milestone;
pub mod voucher;

pub use escrow::{DecisionOutcome, Escrow, EscrowError, EscrowStatus, EscrowTransition};
pub use milestone::{
    Milestone, MilestoneError, MilestoneStatus, MilestoneTransition, ProofOfDelivery,
};
pub use voucher::{
    MaterialVoucher, ValidationStatus, VoucherError, VoucherStatus, VoucherValidation,
};
