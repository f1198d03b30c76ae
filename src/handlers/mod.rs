pub mod availability;
pub mod bookings;
pub mod events;
pub mod health;
pub mod tutors;

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::errors::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/areas", get(tutors::list_areas))
        .route("/api/tutors", get(tutors::list_tutors))
        .route("/api/tutors/:id", get(tutors::get_tutor))
        .route(
            "/api/availability",
            get(availability::list_availability).post(availability::create_availability),
        )
        .route("/api/availability/:id", delete(availability::delete_availability))
        .route("/api/bookings", post(bookings::create_booking))
        .route(
            "/api/bookings/tutor/:tutor_id",
            get(bookings::list_bookings_for_tutor),
        )
        .route("/api/bookings/:id/status", post(bookings::update_status))
        .route("/api/events", get(events::events_stream))
        .with_state(state)
}

// Extractor rejections become the same `{error}` body as every other failure.

pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| AppError::validation(e.body_text()))
}

pub(crate) fn path_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::validation("invalid id"))
}
