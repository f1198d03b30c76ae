use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::errors::AppError;
use crate::models::{Availability, OpenSlot};
use crate::services::slots::{self, SlotFilter, SlotInput};
use crate::state::AppState;

use super::{json_body, path_id};

// GET /api/availability?area=&start=&end=
pub async fn list_availability(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<SlotFilter>,
) -> Result<Json<Vec<OpenSlot>>, AppError> {
    let listing = {
        let db = state.db()?;
        slots::open_slots(&db, &filter)?
    };
    Ok(Json(listing))
}

// POST /api/availability
pub async fn create_availability(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SlotInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Availability>), AppError> {
    let input = json_body(payload)?;
    let slot = slots::create_slot(&state, input)?;
    Ok((StatusCode::CREATED, Json(slot)))
}

// DELETE /api/availability/:id
pub async fn delete_availability(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = path_id(path)?;
    slots::delete_slot(&state, id)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
