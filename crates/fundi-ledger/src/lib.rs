//! # fundi-ledger — Append-Only Fund-Movement Ledger
//!
//! Every attempt to move money through the platform gets a row here
//! before anything else happens, and the row never goes away:
//!
//! - **Transaction** (`transaction.rs`): the row type, status machine
//!   (PENDING → COMPLETED | FAILED | CANCELLED, each transition at most
//!   once), and the duplicate-signal no-op semantics reconciliation
//!   relies on.
//!
//! - **Ledger** (`ledger.rs`): thread-safe append-only store with the
//!   lookups reconciliation needs — by id, by provider reference, by
//!   internal reference — and the PENDING-past-grace scan the polling
//!   sweep works from.
//!
//! ## Crate Policy
//!
//! No provider knowledge, no escrow knowledge. The ledger records what
//! it is told and guarantees at-most-once settlement transitions;
//! deciding what a settlement means belongs to `fundi-settlement`.

pub mod ledger;
pub mod transaction;

pub use ledger::{Ledger, LedgerError, NewTransaction, INTERNAL_REFERENCE_KEY};
pub use transaction::{SignalOutcome, Transaction, TransactionStatus, TransactionType};
