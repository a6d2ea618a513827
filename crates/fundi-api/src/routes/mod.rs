//! # Route Modules
//!
//! Each module defines an Axum Router for one API surface area.
//! Routers are assembled in `lib.rs` into the application. The webhook
//! ingest is the only mutating route; everything else is a read-only
//! view over the engine's aggregates.

pub mod disputes;
pub mod escrows;
pub mod health;
pub mod milestones;
pub mod transactions;
pub mod vouchers;
pub mod webhooks;
