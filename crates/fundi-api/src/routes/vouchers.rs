//! # Voucher Views
//!
//! Voucher aggregates and the append-only redemption audit trail.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Json;
use uuid::Uuid;

use fundi_core::VoucherId;
use fundi_escrow::{MaterialVoucher, VoucherValidation};

use crate::{AppError, AppState};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/v1/vouchers/{id}", get(by_id))
        .route("/v1/validations", get(validations))
}

async fn by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MaterialVoucher>, AppError> {
    Ok(Json(state.engine.voucher(VoucherId(id))?))
}

async fn validations(
    State(state): State<AppState>,
) -> Result<Json<Vec<VoucherValidation>>, AppError> {
    Ok(Json(state.engine.validations()?))
}
