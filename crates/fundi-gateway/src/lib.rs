//! # fundi-gateway — Mobile-Money Provider Adapters
//!
//! Uniform interface over the heterogeneous mobile-money providers the
//! platform settles through:
//!
//! - **Adapter** (`adapter.rs`): the `PaymentGatewayAdapter` trait
//!   (block/transfer/refund/status/webhook verification/prefix support),
//!   the classified `GatewayError` taxonomy, and the canonical
//!   `StatusReport` every provider signal reduces to.
//!
//! - **MTN** (`mtn.rs`) and **Orange Money** (`orange.rs`): per-provider
//!   implementations with their own payload shapes, status vocabularies,
//!   auth headers, and webhook secrets.
//!
//! - **Router** (`router.rs`): adapter selection by phone prefix and by
//!   provider id for webhook dispatch.
//!
//! - **Signature** (`signature.rs`): HMAC-SHA256 webhook verification,
//!   run before any payload processing.
//!
//! - **Sandbox** (`sandbox.rs`): deterministic in-process provider for
//!   tests and local development.
//!
//! ## Crate Policy
//!
//! Adapters hold configuration and an HTTP client, nothing else — no
//! ledger access, no escrow knowledge. Every call carries a bounded
//! timeout; timeouts classify as unknown outcomes and defer to the
//! polling reconciliation path.

pub mod adapter;
pub mod mtn;
pub mod orange;
pub mod router;
pub mod sandbox;
pub mod signature;

pub use adapter::{
    GatewayError, PaymentGatewayAdapter, ProviderKind, ProviderStatus, StatusReport, TransferAck,
    TransferRequest,
};
pub use mtn::{MtnConfig, MtnGateway};
pub use orange::{OrangeConfig, OrangeGateway};
pub use router::GatewayRouter;
pub use sandbox::SandboxGateway;
