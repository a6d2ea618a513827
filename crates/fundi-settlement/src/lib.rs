//! # fundi-settlement — Orchestration Engine
//!
//! Ties the aggregates, the ledger, and the provider gateways into one
//! settlement engine:
//!
//! - **Engine** (`engine.rs`): the [`SettlementEngine`], escrow
//!   creation, payout dispatch, and read-only views.
//! - **Milestones** (`milestones.rs`): payment plans, validation, and
//!   the auto-validation sweep.
//! - **Vouchers** (`vouchers.rs`): issuance, redemption with the fraud
//!   audit trail, cancellation, and the expiry sweep.
//! - **Reconciliation** (`reconcile.rs`): webhook ingest and the
//!   polling sweep, converging on at-most-once ledger transitions.
//! - **Disputes** (`disputes.rs`): the mediation log and arbitration
//!   decision execution behind the single resolution gate.
//! - **Directory** (`directory.rs`): the identity seam supplying
//!   eligibility and wallet numbers.
//!
//! ## Concurrency
//!
//! All aggregate maps live behind one store lock; cross-aggregate
//! mutations and their ledger rows commit under a single guard. Provider
//! calls always happen after the guard drops and carry bounded timeouts;
//! an unknown outcome leaves the row PENDING for the polling path.

mod directory;
mod disputes;
mod engine;
mod error;
mod milestones;
mod reconcile;
mod store;
mod vouchers;

pub use directory::{InMemoryDirectory, UserDirectory};
pub use engine::SettlementEngine;
