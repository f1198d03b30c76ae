use std::sync::Arc;

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Area, Tutor, TutorDetail};
use crate::services::directory;
use crate::state::AppState;

use super::path_id;

// GET /api/areas
pub async fn list_areas(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Area>>, AppError> {
    let areas = {
        let db = state.db()?;
        queries::list_areas(&db)?
    };
    Ok(Json(areas))
}

// GET /api/tutors?area=
#[derive(Deserialize)]
pub struct TutorQuery {
    pub area: Option<String>,
}

pub async fn list_tutors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TutorQuery>,
) -> Result<Json<Vec<Tutor>>, AppError> {
    let area = query.area.as_deref().filter(|a| !a.is_empty());
    let tutors = {
        let db = state.db()?;
        queries::list_tutors(&db, area)?
    };
    Ok(Json(tutors))
}

// GET /api/tutors/:id
pub async fn get_tutor(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<TutorDetail>, AppError> {
    let id = path_id(path)?;
    let detail = {
        let db = state.db()?;
        directory::tutor_detail(&db, id)?
    };
    Ok(Json(detail))
}
