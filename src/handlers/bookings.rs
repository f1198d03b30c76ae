use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingWithClient};
use crate::services::admission::{self, BookingInput};
use crate::state::AppState;

use super::{json_body, path_id};

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BookingInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let input = json_body(payload)?;
    let booking = admission::create_booking(&state, input)?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings/tutor/:tutor_id
pub async fn list_bookings_for_tutor(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<BookingWithClient>>, AppError> {
    let tutor_id = path_id(path)?;
    let bookings = {
        let db = state.db()?;
        queries::list_bookings_for_tutor(&db, tutor_id)?
    };
    Ok(Json(bookings))
}

// POST /api/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let id = path_id(path)?;
    let body = json_body(payload)?;
    let booking = admission::set_booking_status(&state, id, body.status.as_deref())?;
    Ok(Json(booking))
}
