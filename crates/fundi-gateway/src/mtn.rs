//! # MTN Mobile Money Adapter
//!
//! Implements [`PaymentGatewayAdapter`] over the MTN MoMo API family:
//! collections for blocking client funds, disbursements for payouts and
//! refunds. MTN uses caller-generated reference UUIDs (`X-Reference-Id`),
//! so the provider reference is minted here at initiation time.
//!
//! Status vocabulary: `PENDING`, `SUCCESSFUL`, `FAILED`, `REJECTED`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fundi_core::PhoneNumber;

use crate::adapter::{
    classify_http_status, classify_transport_error, GatewayError, PaymentGatewayAdapter,
    ProviderKind, ProviderStatus, StatusReport, TransferAck, TransferRequest,
};
use crate::signature;

/// MTN adapter configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MtnConfig {
    /// API base URL (sandbox or production).
    pub base_url: String,
    /// `Ocp-Apim-Subscription-Key` for the MoMo products.
    pub subscription_key: String,
    /// `X-Target-Environment` header value.
    pub target_environment: String,
    /// Shared secret for webhook HMAC verification.
    pub webhook_secret: String,
    /// MSISDN prefixes this provider serves (digits, no `+`).
    pub prefixes: Vec<String>,
    /// Bounded timeout for every call, in seconds.
    pub timeout_secs: u64,
}

/// MTN Mobile Money gateway.
pub struct MtnGateway {
    config: MtnConfig,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MtnMovementPayload {
    amount: String,
    currency: String,
    external_id: String,
    payee: MtnParty,
    payer_message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MtnParty {
    party_id_type: &'static str,
    party_id: String,
}

/// Shape shared by MTN status responses and webhook bodies.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MtnStatusPayload {
    financial_transaction_id: Option<String>,
    external_id: Option<String>,
    status: String,
    reason: Option<String>,
}

impl MtnGateway {
    /// Build an adapter with a bounded-timeout HTTP client.
    pub fn new(config: MtnConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    fn movement_payload(&self, request: &TransferRequest) -> MtnMovementPayload {
        MtnMovementPayload {
            amount: request.amount.minor_units().to_string(),
            currency: "XAF".to_string(),
            external_id: request.reference.clone(),
            payee: MtnParty {
                party_id_type: "MSISDN",
                party_id: request.msisdn.digits().to_string(),
            },
            payer_message: request.note.clone(),
        }
    }

    /// POST a movement with a freshly minted reference UUID.
    ///
    /// MTN acknowledges with 202 and an empty body; the minted UUID is
    /// the provider reference all later signals carry.
    async fn initiate(
        &self,
        path: &str,
        request: &TransferRequest,
    ) -> Result<TransferAck, GatewayError> {
        let reference = Uuid::new_v4().to_string();
        let url = format!("{}{path}", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.config.subscription_key)
            .header("X-Reference-Id", &reference)
            .header("X-Target-Environment", &self.config.target_environment)
            .json(&self.movement_payload(request))
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_status(status, body));
        }
        tracing::debug!(provider = "mtn", %reference, amount = %request.amount, "movement initiated");
        Ok(TransferAck {
            provider_reference: reference,
        })
    }

    fn map_status(payload: MtnStatusPayload, fallback_reference: &str) -> Result<StatusReport, GatewayError> {
        let status = match payload.status.as_str() {
            "PENDING" => ProviderStatus::Pending,
            "SUCCESSFUL" => ProviderStatus::Completed,
            "FAILED" | "REJECTED" => ProviderStatus::Failed,
            other => {
                return Err(GatewayError::Payload(format!(
                    "unknown MTN status: {other:?}"
                )))
            }
        };
        Ok(StatusReport {
            transaction_id: payload
                .financial_transaction_id
                .unwrap_or_else(|| fallback_reference.to_string()),
            status,
            reference: payload.external_id,
            error_message: payload.reason,
        })
    }
}

#[async_trait]
impl PaymentGatewayAdapter for MtnGateway {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Mtn
    }

    fn supports_phone_number(&self, phone: &PhoneNumber) -> bool {
        self.config.prefixes.iter().any(|p| phone.has_prefix(p))
    }

    async fn block_funds(&self, request: &TransferRequest) -> Result<TransferAck, GatewayError> {
        self.initiate("/collection/v1_0/requesttopay", request).await
    }

    async fn transfer_funds(&self, request: &TransferRequest) -> Result<TransferAck, GatewayError> {
        self.initiate("/disbursement/v1_0/transfer", request).await
    }

    async fn refund_funds(&self, request: &TransferRequest) -> Result<TransferAck, GatewayError> {
        self.initiate("/disbursement/v1_0/refund", request).await
    }

    async fn check_status(&self, provider_reference: &str) -> Result<StatusReport, GatewayError> {
        let url = format!(
            "{}/v1_0/transaction/{provider_reference}",
            self.config.base_url
        );
        let response = self
            .http
            .get(&url)
            .header("Ocp-Apim-Subscription-Key", &self.config.subscription_key)
            .header("X-Target-Environment", &self.config.target_environment)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_status(status, body));
        }
        let payload: MtnStatusPayload = response
            .json()
            .await
            .map_err(|e| GatewayError::Payload(format!("bad MTN status body: {e}")))?;
        Self::map_status(payload, provider_reference)
    }

    fn verify_webhook_signature(&self, body: &[u8], sig: &str) -> Result<(), GatewayError> {
        signature::verify(self.config.webhook_secret.as_bytes(), body, sig)
    }

    fn parse_webhook(&self, body: &[u8]) -> Result<StatusReport, GatewayError> {
        let payload: MtnStatusPayload = serde_json::from_slice(body)
            .map_err(|e| GatewayError::Payload(format!("bad MTN webhook body: {e}")))?;
        Self::map_status(payload, "")
    }
}
