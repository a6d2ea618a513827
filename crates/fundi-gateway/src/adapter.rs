//! # Gateway Adapter Interface
//!
//! One uniform interface over heterogeneous mobile-money providers.
//! Every provider implements [`PaymentGatewayAdapter`]; selection happens
//! by phone-number prefix in the router. Adapters share no mutable state
//! beyond their own configuration.
//!
//! Failures are classified, never swallowed: authentication problems,
//! network problems, provider rejections, and unknown outcomes (timeouts)
//! are distinct because the engine reacts differently to each — unknown
//! outcomes defer to the polling reconciliation path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fundi_core::{MoneyAmount, PhoneNumber};

/// The providers the platform settles over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// MTN Mobile Money.
    Mtn,
    /// Orange Money.
    OrangeMoney,
    /// Deterministic in-process provider for tests and local development.
    Sandbox,
}

impl ProviderKind {
    /// Stable identifier used in webhook route paths and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mtn => "mtn",
            Self::OrangeMoney => "orange",
            Self::Sandbox => "sandbox",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mtn" => Ok(Self::Mtn),
            "orange" => Ok(Self::OrangeMoney),
            "sandbox" => Ok(Self::Sandbox),
            other => Err(GatewayError::UnknownProvider(other.to_string())),
        }
    }
}

/// Classified gateway failure.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Credentials rejected by the provider.
    #[error("provider authentication failed: {0}")]
    Auth(String),

    /// Could not reach the provider or the provider errored internally.
    #[error("provider network error: {0}")]
    Network(String),

    /// The provider understood and refused the request.
    #[error("provider rejected request: {0}")]
    Rejected(String),

    /// The call did not resolve (timeout). The transfer may or may not
    /// have happened — the polling path settles it.
    #[error("provider outcome unknown: {0}")]
    Unknown(String),

    /// Webhook signature did not verify.
    #[error("webhook signature invalid: {0}")]
    BadSignature(String),

    /// Webhook or status payload did not parse.
    #[error("malformed provider payload: {0}")]
    Payload(String),

    /// No adapter supports the phone number.
    #[error("no provider routes phone number {0}")]
    Unroutable(String),

    /// Unknown provider identifier in a route path.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

impl GatewayError {
    /// Whether the operation should be left PENDING for the polling
    /// sweep rather than failed outright.
    pub fn defers_to_polling(&self) -> bool {
        matches!(self, Self::Unknown(_) | Self::Network(_))
    }
}

/// Canonical provider-side settlement status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderStatus {
    /// Still processing at the provider.
    Pending,
    /// Settled successfully.
    Completed,
    /// Failed at the provider.
    Failed,
    /// Cancelled before execution.
    Cancelled,
}

/// A provider signal mapped to canonical form.
///
/// Both webhook payloads and `check_status` responses reduce to this;
/// reconciliation only ever sees this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    /// Provider-side transaction identifier.
    pub transaction_id: String,
    /// Canonical settlement status.
    pub status: ProviderStatus,
    /// Our reference, when the provider echoes it back.
    pub reference: Option<String>,
    /// Provider failure detail, if any.
    pub error_message: Option<String>,
}

/// A fund movement request handed to an adapter.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Engine-side reference; providers echo it in webhooks.
    pub reference: String,
    /// Amount in minor units.
    pub amount: MoneyAmount,
    /// Counterparty wallet.
    pub msisdn: PhoneNumber,
    /// Human-readable statement line.
    pub note: String,
}

/// Provider acknowledgement of an initiated movement.
///
/// Acceptance is not settlement: the movement stays PENDING in the
/// ledger until a webhook or poll confirms it.
#[derive(Debug, Clone)]
pub struct TransferAck {
    /// Provider-side reference to reconcile against.
    pub provider_reference: String,
}

/// Uniform interface over mobile-money providers.
///
/// One implementation per provider, selected by phone prefix. All calls
/// carry the adapter's configured bounded timeout.
#[async_trait]
pub trait PaymentGatewayAdapter: Send + Sync {
    /// Which provider this adapter fronts.
    fn provider(&self) -> ProviderKind;

    /// Whether this adapter's provider serves the number (prefix routing).
    fn supports_phone_number(&self, phone: &PhoneNumber) -> bool;

    /// Block funds from a wallet into the platform (client deposit).
    async fn block_funds(&self, request: &TransferRequest) -> Result<TransferAck, GatewayError>;

    /// Pay funds out to a wallet (artisan or supplier payout).
    async fn transfer_funds(&self, request: &TransferRequest) -> Result<TransferAck, GatewayError>;

    /// Return funds to a wallet (client refund).
    async fn refund_funds(&self, request: &TransferRequest) -> Result<TransferAck, GatewayError>;

    /// Query the provider for the state of an initiated movement.
    async fn check_status(&self, provider_reference: &str) -> Result<StatusReport, GatewayError>;

    /// Verify a webhook body against its signature header.
    ///
    /// Must run before any payload processing; a failure means the
    /// request is discarded and logged, with no state change.
    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> Result<(), GatewayError>;

    /// Map a verified webhook body to the canonical status report.
    fn parse_webhook(&self, body: &[u8]) -> Result<StatusReport, GatewayError>;
}

/// Map a reqwest transport error to the gateway taxonomy.
pub(crate) fn classify_transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Unknown(format!("request timed out: {err}"))
    } else if err.is_connect() {
        GatewayError::Network(format!("connection failed: {err}"))
    } else {
        GatewayError::Network(err.to_string())
    }
}

/// Map an HTTP status from a provider to the gateway taxonomy.
pub(crate) fn classify_http_status(
    status: reqwest::StatusCode,
    body: String,
) -> GatewayError {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        GatewayError::Auth(format!("{status}: {body}"))
    } else if status.is_client_error() {
        GatewayError::Rejected(format!("{status}: {body}"))
    } else {
        GatewayError::Network(format!("{status}: {body}"))
    }
}
