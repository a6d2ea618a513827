//! # Orange Money Adapter
//!
//! Implements [`PaymentGatewayAdapter`] over the Orange Money API:
//! web-payment for blocking client funds, cash-in for payouts. Orange
//! mints its own transaction id (`txnid`) and returns it in the
//! initiation response.
//!
//! Status vocabulary: `INITIATED`, `PENDING`, `SUCCESS`, `FAILED`,
//! `EXPIRED`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use fundi_core::PhoneNumber;

use crate::adapter::{
    classify_http_status, classify_transport_error, GatewayError, PaymentGatewayAdapter,
    ProviderKind, ProviderStatus, StatusReport, TransferAck, TransferRequest,
};
use crate::signature;

/// Orange Money adapter configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OrangeConfig {
    /// API base URL.
    pub base_url: String,
    /// OAuth bearer token for the merchant account.
    pub access_token: String,
    /// Merchant identifier sent with every movement.
    pub merchant_key: String,
    /// Shared secret for webhook HMAC verification.
    pub webhook_secret: String,
    /// MSISDN prefixes this provider serves (digits, no `+`).
    pub prefixes: Vec<String>,
    /// Bounded timeout for every call, in seconds.
    pub timeout_secs: u64,
}

/// Orange Money gateway.
pub struct OrangeGateway {
    config: OrangeConfig,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct OrangeMovementPayload {
    merchant_key: String,
    order_id: String,
    amount: u64,
    currency: String,
    subscriber_msisdn: String,
    reference_label: String,
}

#[derive(Debug, Deserialize)]
struct OrangeAckPayload {
    txnid: String,
}

/// Shape shared by Orange status responses and webhook bodies.
#[derive(Debug, Deserialize)]
struct OrangeStatusPayload {
    txnid: Option<String>,
    order_id: Option<String>,
    status: String,
    message: Option<String>,
}

impl OrangeGateway {
    /// Build an adapter with a bounded-timeout HTTP client.
    pub fn new(config: OrangeConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    fn movement_payload(&self, request: &TransferRequest) -> OrangeMovementPayload {
        OrangeMovementPayload {
            merchant_key: self.config.merchant_key.clone(),
            order_id: request.reference.clone(),
            amount: request.amount.minor_units(),
            currency: "XAF".to_string(),
            subscriber_msisdn: request.msisdn.digits().to_string(),
            reference_label: request.note.clone(),
        }
    }

    async fn initiate(
        &self,
        path: &str,
        request: &TransferRequest,
    ) -> Result<TransferAck, GatewayError> {
        let url = format!("{}{path}", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(&self.movement_payload(request))
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_status(status, body));
        }
        let ack: OrangeAckPayload = response
            .json()
            .await
            .map_err(|e| GatewayError::Payload(format!("bad Orange ack body: {e}")))?;
        tracing::debug!(provider = "orange", txnid = %ack.txnid, amount = %request.amount, "movement initiated");
        Ok(TransferAck {
            provider_reference: ack.txnid,
        })
    }

    fn map_status(payload: OrangeStatusPayload, fallback_reference: &str) -> Result<StatusReport, GatewayError> {
        let status = match payload.status.as_str() {
            "INITIATED" | "PENDING" => ProviderStatus::Pending,
            "SUCCESS" => ProviderStatus::Completed,
            "FAILED" => ProviderStatus::Failed,
            "EXPIRED" => ProviderStatus::Cancelled,
            other => {
                return Err(GatewayError::Payload(format!(
                    "unknown Orange status: {other:?}"
                )))
            }
        };
        Ok(StatusReport {
            transaction_id: payload
                .txnid
                .unwrap_or_else(|| fallback_reference.to_string()),
            status,
            reference: payload.order_id,
            error_message: payload.message,
        })
    }
}

#[async_trait]
impl PaymentGatewayAdapter for OrangeGateway {
    fn provider(&self) -> ProviderKind {
        ProviderKind::OrangeMoney
    }

    fn supports_phone_number(&self, phone: &PhoneNumber) -> bool {
        self.config.prefixes.iter().any(|p| phone.has_prefix(p))
    }

    async fn block_funds(&self, request: &TransferRequest) -> Result<TransferAck, GatewayError> {
        self.initiate("/omcoreapis/1.0.2/mp/pay", request).await
    }

    async fn transfer_funds(&self, request: &TransferRequest) -> Result<TransferAck, GatewayError> {
        self.initiate("/omcoreapis/1.0.2/cashin", request).await
    }

    async fn refund_funds(&self, request: &TransferRequest) -> Result<TransferAck, GatewayError> {
        self.initiate("/omcoreapis/1.0.2/refund", request).await
    }

    async fn check_status(&self, provider_reference: &str) -> Result<StatusReport, GatewayError> {
        let url = format!(
            "{}/omcoreapis/1.0.2/mp/paymentstatus/{provider_reference}",
            self.config.base_url
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_status(status, body));
        }
        let payload: OrangeStatusPayload = response
            .json()
            .await
            .map_err(|e| GatewayError::Payload(format!("bad Orange status body: {e}")))?;
        Self::map_status(payload, provider_reference)
    }

    fn verify_webhook_signature(&self, body: &[u8], sig: &str) -> Result<(), GatewayError> {
        signature::verify(self.config.webhook_secret.as_bytes(), body, sig)
    }

    fn parse_webhook(&self, body: &[u8]) -> Result<StatusReport, GatewayError> {
        let payload: OrangeStatusPayload = serde_json::from_slice(body)
            .map_err(|e| GatewayError::Payload(format!("bad Orange webhook body: {e}")))?;
        Self::map_status(payload, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> OrangeGateway {
        OrangeGateway::new(OrangeConfig {
            base_url: "https://api.orange.example".into(),
            access_token: "token".into(),
            merchant_key: "merchant".into(),
            webhook_secret: "orange-secret".into(),
            prefixes: vec!["23769".into(), "23765".into()],
            timeout_secs: 10,
        })
        .unwrap()
    }

    #[test]
    fn test_prefix_routing() {
        let gw = gateway();
        let orange = PhoneNumber::parse("237690001122").unwrap();
        let other = PhoneNumber::parse("237677123456").unwrap();
        assert!(gw.supports_phone_number(&orange));
        assert!(!gw.supports_phone_number(&other));
    }

    #[test]
    fn test_parse_webhook_success() {
        let gw = gateway();
        let body = br#"{
            "txnid": "OM-778899",
            "order_id": "fundi-ref-42",
            "status": "SUCCESS"
        }"#;
        let report = gw.parse_webhook(body).unwrap();
        assert_eq!(report.status, ProviderStatus::Completed);
        assert_eq!(report.transaction_id, "OM-778899");
        assert_eq!(report.reference.as_deref(), Some("fundi-ref-42"));
    }

    #[test]
    fn test_parse_webhook_expired_maps_to_cancelled() {
        let gw = gateway();
        let body = br#"{"txnid": "OM-1", "status": "EXPIRED", "message": "payment window closed"}"#;
        let report = gw.parse_webhook(body).unwrap();
        assert_eq!(report.status, ProviderStatus::Cancelled);
        assert_eq!(report.error_message.as_deref(), Some("payment window closed"));
    }

    #[test]
    fn test_parse_webhook_initiated_is_pending() {
        let gw = gateway();
        let body = br#"{"txnid": "OM-2", "status": "INITIATED"}"#;
        let report = gw.parse_webhook(body).unwrap();
        assert_eq!(report.status, ProviderStatus::Pending);
    }

    #[test]
    fn test_parse_webhook_unknown_status_rejected() {
        let gw = gateway();
        let body = br#"{"txnid": "OM-3", "status": "WEIRD"}"#;
        assert!(matches!(
            gw.parse_webhook(body),
            Err(GatewayError::Payload(_))
        ));
    }

    #[test]
    fn test_webhook_signature_roundtrip() {
        let gw = gateway();
        let body = br#"{"status":"SUCCESS"}"#;
        let sig = signature::sign(b"orange-secret", body);
        assert!(gw.verify_webhook_signature(body, &sig).is_ok());
        assert!(gw
            .verify_webhook_signature(body, &signature::sign(b"wrong", body))
            .is_err());
    }
}
