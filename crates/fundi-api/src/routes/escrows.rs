//! # Escrow Views

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Json;
use uuid::Uuid;

use fundi_core::{EscrowId, MissionId};
use fundi_escrow::Escrow;

use crate::{AppError, AppState};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/v1/escrows/{id}", get(by_id))
        .route("/v1/missions/{id}/escrow", get(by_mission))
}

async fn by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Escrow>, AppError> {
    Ok(Json(state.engine.escrow(EscrowId(id))?))
}

async fn by_mission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Escrow>, AppError> {
    Ok(Json(state.engine.escrow_for_mission(MissionId(id))?))
}
