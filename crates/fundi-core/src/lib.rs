//! # fundi-core — Shared Domain Types
//!
//! Foundation crate for the Fundi settlement engine:
//!
//! - **Money** (`money.rs`): `MoneyAmount`, non-negative minor-unit
//!   amounts with checked arithmetic. No floats in money paths.
//!
//! - **Identity** (`identity.rs`): per-aggregate identifier newtypes and
//!   `PhoneNumber` for provider routing.
//!
//! - **Temporal** (`temporal.rs`): UTC-only `Timestamp` with seconds
//!   precision.
//!
//! - **Geo** (`geo.rs`): `GeoPoint` and haversine distance for the
//!   voucher validation fraud signal.
//!
//! - **Config** (`config.rs`): `SettlementConfig` — operational windows
//!   and rates as configuration rather than constants.
//!
//! - **Error** (`error.rs`): the engine-wide error taxonomy.
//!
//! ## Crate Policy
//!
//! No I/O, no async, no provider knowledge. Everything here is a value
//! type the rest of the workspace agrees on.

pub mod config;
pub mod error;
pub mod geo;
pub mod identity;
pub mod money;
pub mod temporal;

pub use config::SettlementConfig;
pub use error::EngineError;
pub use geo::{haversine_meters, GeoPoint};
pub use identity::{
    DisputeId, EscrowId, MilestoneId, MissionId, PhoneNumber, PhoneNumberError, TransactionId,
    UserId, ValidationId, VoucherId, WorksiteId,
};
pub use money::{MoneyAmount, MoneyError};
pub use temporal::{Timestamp, TimestampError};
