use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use ulid::Ulid;

use super::dto::*;
use super::{ApiError, AppState};

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingDto>), ApiError> {
    let Json(req) = payload?;
    let booking = state.engine.reserve(req.slot_id, req.user_name).await?;
    Ok((StatusCode::CREATED, Json(booking.into())))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<BookingDto>>, ApiError> {
    let bookings = state.engine.list_bookings()?;
    Ok(Json(bookings.into_iter().map(BookingDto::from).collect()))
}

pub async fn get_one(
    State(state): State<AppState>,
    id: Result<Path<Ulid>, PathRejection>,
) -> Result<Json<BookingDto>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.engine.get_booking(id)?.into()))
}

pub async fn cancel(
    State(state): State<AppState>,
    id: Result<Path<Ulid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.engine.cancel(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
