//! # Sandbox Gateway
//!
//! A deterministic in-process provider for tests and local development.
//! Movements are acknowledged with sequential `SBX-n` references;
//! `check_status` answers `COMPLETED` unless a status has been scripted.
//! Webhooks use the same HMAC scheme as real providers and the canonical
//! report shape as their payload.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use fundi_core::PhoneNumber;

use crate::adapter::{
    GatewayError, PaymentGatewayAdapter, ProviderKind, ProviderStatus, StatusReport, TransferAck,
    TransferRequest,
};
use crate::signature;

#[derive(Default)]
struct SandboxState {
    counter: u64,
    /// Scripted status per provider reference; unscripted refs complete.
    statuses: HashMap<String, StatusReport>,
    /// Reason for the next initiation to fail with an unknown outcome.
    fail_next: Option<String>,
    /// Reason for the next initiation to be definitively rejected.
    reject_next: Option<String>,
    /// Reference of the last initiated movement.
    last_reference: Option<String>,
}

/// Deterministic sandbox provider.
pub struct SandboxGateway {
    prefixes: Vec<String>,
    webhook_secret: String,
    state: Mutex<SandboxState>,
}

impl SandboxGateway {
    /// A sandbox serving the given MSISDN prefixes.
    pub fn new(prefixes: Vec<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            prefixes,
            webhook_secret: webhook_secret.into(),
            state: Mutex::new(SandboxState::default()),
        }
    }

    /// A sandbox that routes every number. Handy default for tests.
    pub fn unrestricted(webhook_secret: impl Into<String>) -> Self {
        Self::new(vec![String::new()], webhook_secret)
    }

    /// Script the report `check_status` returns for a reference.
    pub fn script_status(&self, provider_reference: &str, report: StatusReport) {
        self.state
            .lock()
            .expect("sandbox state lock")
            .statuses
            .insert(provider_reference.to_string(), report);
    }

    /// Make the next initiation fail with an unknown outcome (timeout).
    pub fn fail_next_initiation(&self, reason: &str) {
        self.state.lock().expect("sandbox state lock").fail_next = Some(reason.to_string());
    }

    /// Make the next initiation fail with a definitive rejection.
    pub fn reject_next_initiation(&self, reason: &str) {
        self.state.lock().expect("sandbox state lock").reject_next = Some(reason.to_string());
    }

    /// The provider reference minted by the most recent initiation.
    pub fn last_reference(&self) -> Option<String> {
        self.state
            .lock()
            .expect("sandbox state lock")
            .last_reference
            .clone()
    }

    /// Build a signed webhook (body, signature) for a report.
    pub fn signed_webhook(&self, report: &StatusReport) -> (Vec<u8>, String) {
        let body = serde_json::to_vec(report).expect("report serializes");
        let sig = signature::sign(self.webhook_secret.as_bytes(), &body);
        (body, sig)
    }

    fn initiate(&self, request: &TransferRequest) -> Result<TransferAck, GatewayError> {
        let mut state = self.state.lock().expect("sandbox state lock");
        if let Some(reason) = state.fail_next.take() {
            return Err(GatewayError::Unknown(reason));
        }
        if let Some(reason) = state.reject_next.take() {
            return Err(GatewayError::Rejected(reason));
        }
        state.counter += 1;
        let reference = format!("SBX-{}", state.counter);
        state.last_reference = Some(reference.clone());
        tracing::debug!(provider = "sandbox", %reference, amount = %request.amount, "movement initiated");
        Ok(TransferAck {
            provider_reference: reference,
        })
    }
}

#[async_trait]
impl PaymentGatewayAdapter for SandboxGateway {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Sandbox
    }

    fn supports_phone_number(&self, phone: &PhoneNumber) -> bool {
        self.prefixes.iter().any(|p| phone.has_prefix(p))
    }

    async fn block_funds(&self, request: &TransferRequest) -> Result<TransferAck, GatewayError> {
        self.initiate(request)
    }

    async fn transfer_funds(&self, request: &TransferRequest) -> Result<TransferAck, GatewayError> {
        self.initiate(request)
    }

    async fn refund_funds(&self, request: &TransferRequest) -> Result<TransferAck, GatewayError> {
        self.initiate(request)
    }

    async fn check_status(&self, provider_reference: &str) -> Result<StatusReport, GatewayError> {
        let state = self.state.lock().expect("sandbox state lock");
        Ok(state
            .statuses
            .get(provider_reference)
            .cloned()
            .unwrap_or_else(|| StatusReport {
                transaction_id: provider_reference.to_string(),
                status: ProviderStatus::Completed,
                reference: None,
                error_message: None,
            }))
    }

    fn verify_webhook_signature(&self, body: &[u8], sig: &str) -> Result<(), GatewayError> {
        signature::verify(self.webhook_secret.as_bytes(), body, sig)
    }

    fn parse_webhook(&self, body: &[u8]) -> Result<StatusReport, GatewayError> {
        serde_json::from_slice(body)
            .map_err(|e| GatewayError::Payload(format!("bad sandbox webhook body: {e}")))
    }
}
