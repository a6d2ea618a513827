//! # Provider Webhook Ingest
//!
//! One authenticated endpoint per provider. The HMAC signature travels
//! in the `X-Webhook-Signature` header and is verified before the body
//! is parsed; a bad signature is a 401 with no state change, so the
//! provider retries.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::Json;

use fundi_gateway::ProviderKind;

use crate::{AppError, AppState};

/// Header carrying the hex HMAC-SHA256 signature of the raw body.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/v1/webhooks/{provider}", post(ingest))
}

async fn ingest(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let provider: ProviderKind = provider
        .parse()
        .map_err(|_| AppError::BadRequest(format!("unknown provider {provider}")))?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest(format!("missing {SIGNATURE_HEADER} header")))?;
    let outcome = state.engine.ingest_webhook(provider, &body, signature)?;
    Ok(Json(serde_json::json!({ "applied": outcome.applied() })))
}
