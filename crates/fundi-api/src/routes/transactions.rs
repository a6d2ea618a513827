//! # Ledger Views

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Json;
use uuid::Uuid;

use fundi_core::TransactionId;
use fundi_ledger::Transaction;

use crate::{AppError, AppState};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/v1/transactions", get(list))
        .route("/v1/transactions/{id}", get(by_id))
}

async fn list(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    Json(state.engine.transactions())
}

async fn by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, AppError> {
    Ok(Json(state.engine.transaction(TransactionId(id))?))
}
