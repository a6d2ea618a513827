//! # Dispute Views

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Json;
use uuid::Uuid;

use fundi_core::DisputeId;
use fundi_dispute::Dispute;

use crate::{AppError, AppState};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/v1/disputes/{id}", get(by_id))
}

async fn by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Dispute>, AppError> {
    Ok(Json(state.engine.dispute(DisputeId(id))?))
}
