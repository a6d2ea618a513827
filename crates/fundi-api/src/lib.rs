//! # fundi-api — HTTP Surface
//!
//! Axum service over the settlement engine. The only mutating route is
//! the per-provider webhook ingest; every aggregate is otherwise exposed
//! as a read-only view. Sweeps and mutations run inside the engine, not
//! over HTTP.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::AppError;
pub use state::AppState;

use tower_http::trace::TraceLayer;

/// Assemble the application router.
pub fn app(state: AppState) -> axum::Router {
    axum::Router::new()
        .merge(routes::health::router())
        .merge(routes::webhooks::router())
        .merge(routes::escrows::router())
        .merge(routes::milestones::router())
        .merge(routes::vouchers::router())
        .merge(routes::disputes::router())
        .merge(routes::transactions::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use fundi_core::{MissionId, MoneyAmount, PhoneNumber, SettlementConfig, UserId};
    use fundi_gateway::{
        GatewayRouter, PaymentGatewayAdapter, ProviderStatus, SandboxGateway, StatusReport,
    };
    use fundi_settlement::{InMemoryDirectory, SettlementEngine};

    use super::*;
    use crate::routes::webhooks::SIGNATURE_HEADER;

    fn test_app() -> (axum::Router, Arc<SandboxGateway>, Arc<SettlementEngine>) {
        let sandbox = Arc::new(SandboxGateway::unrestricted("api-test-secret"));
        let router = GatewayRouter::new(vec![sandbox.clone() as Arc<dyn PaymentGatewayAdapter>]);
        let directory = Arc::new(InMemoryDirectory::permissive(
            PhoneNumber::parse("237677123456").unwrap(),
        ));
        let engine = Arc::new(SettlementEngine::new(
            SettlementConfig::default(),
            router,
            directory,
        ));
        (app(AppState::new(engine.clone())), sandbox, engine)
    }

    #[tokio::test]
    async fn test_health_probe() {
        let (app, _, _) = test_app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_escrow_is_404() {
        let (app, _, _) = test_app();
        let uri = format!("/v1/escrows/{}", uuid::Uuid::new_v4());
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_escrow_view_serves_aggregate() {
        let (app, _, engine) = test_app();
        let escrow = engine
            .create_escrow(
                MissionId::new(),
                UserId::new(),
                UserId::new(),
                MoneyAmount::from_minor(10_000),
                MoneyAmount::from_minor(40_000),
            )
            .await
            .unwrap();
        let uri = format!("/v1/escrows/{}", escrow.id.as_uuid());
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "BLOCKED");
        assert_eq!(body["materials_amount"], 10_000);
    }

    #[tokio::test]
    async fn test_webhook_requires_signature_header() {
        let (app, _, _) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/webhooks/sandbox")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_rejects_unknown_provider() {
        let (app, _, _) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/webhooks/wave")
                    .header(SIGNATURE_HEADER, "deadbeef")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_settles_pending_deposit() {
        let (app, sandbox, engine) = test_app();
        engine
            .create_escrow(
                MissionId::new(),
                UserId::new(),
                UserId::new(),
                MoneyAmount::from_minor(10_000),
                MoneyAmount::ZERO,
            )
            .await
            .unwrap();
        let report = StatusReport {
            transaction_id: sandbox.last_reference().unwrap(),
            status: ProviderStatus::Completed,
            reference: None,
            error_message: None,
        };
        let (body, sig) = sandbox.signed_webhook(&report);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/webhooks/sandbox")
                    .header(SIGNATURE_HEADER, &sig)
                    .body(Body::from(body.clone()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["applied"], true);

        // Redelivery is accepted but applies nothing.
        let replay = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/webhooks/sandbox")
                    .header(SIGNATURE_HEADER, &sig)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(replay.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(replay.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["applied"], false);
    }

    #[tokio::test]
    async fn test_webhook_bad_signature_is_401() {
        let (app, sandbox, engine) = test_app();
        engine
            .create_escrow(
                MissionId::new(),
                UserId::new(),
                UserId::new(),
                MoneyAmount::from_minor(10_000),
                MoneyAmount::ZERO,
            )
            .await
            .unwrap();
        let report = StatusReport {
            transaction_id: sandbox.last_reference().unwrap(),
            status: ProviderStatus::Completed,
            reference: None,
            error_message: None,
        };
        let (body, _) = sandbox.signed_webhook(&report);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/webhooks/sandbox")
                    .header(SIGNATURE_HEADER, "deadbeef")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
