use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use ulid::Ulid;

use super::dto::*;
use super::{ApiError, AppState};

pub async fn create(
    State(state): State<AppState>,
    venue_id: Result<Path<Ulid>, PathRejection>,
    payload: Result<Json<CreateSlotRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SlotDto>), ApiError> {
    let Path(venue_id) = venue_id?;
    let Json(req) = payload?;
    let slot = state
        .engine
        .create_slot(venue_id, req.start_time, req.end_time)
        .await?;
    Ok((StatusCode::CREATED, Json(slot.into())))
}

pub async fn list(
    State(state): State<AppState>,
    venue_id: Result<Path<Ulid>, PathRejection>,
) -> Result<Json<Vec<SlotDto>>, ApiError> {
    let Path(venue_id) = venue_id?;
    let slots = state.engine.list_slots(venue_id).await?;
    Ok(Json(slots.into_iter().map(SlotDto::from).collect()))
}

pub async fn get_one(
    State(state): State<AppState>,
    id: Result<Path<Ulid>, PathRejection>,
) -> Result<Json<SlotDto>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.engine.get_slot(id).await?.into()))
}
