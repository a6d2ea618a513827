//! # Milestone Views

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Json;
use uuid::Uuid;

use fundi_core::MilestoneId;
use fundi_escrow::Milestone;

use crate::{AppError, AppState};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/v1/milestones/{id}", get(by_id))
}

async fn by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Milestone>, AppError> {
    Ok(Json(state.engine.milestone(MilestoneId(id))?))
}
