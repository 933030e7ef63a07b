use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use futures::StreamExt;
use ulid::Ulid;

use super::dto::*;
use super::{ApiError, AppState};

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateVenueRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VenueDto>), ApiError> {
    let Json(req) = payload?;
    let venue = state
        .engine
        .create_venue(req.name, req.location, req.sport_id)
        .await?;
    Ok((StatusCode::CREATED, Json(venue.into())))
}

pub async fn list(
    State(state): State<AppState>,
    filter: Result<Query<VenueFilter>, QueryRejection>,
) -> Result<Json<Vec<VenueDto>>, ApiError> {
    let Query(filter) = filter?;
    let venues = state.engine.list_venues(filter.sport_id.as_deref());
    Ok(Json(venues.into_iter().map(VenueDto::from).collect()))
}

pub async fn get_one(
    State(state): State<AppState>,
    id: Result<Path<Ulid>, PathRejection>,
) -> Result<Json<VenueDto>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.engine.get_venue(id)?.into()))
}

pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<Ulid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.engine.delete_venue(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Venues with an Available slot inside the requested window, one row per slot.
pub async fn available(
    State(state): State<AppState>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<Vec<AvailableVenueDto>>, ApiError> {
    let Query(query) = query?;
    let rows = state
        .engine
        .find_available(query.sport_id.as_deref(), query.start_time, query.end_time)?
        .map(AvailableVenueDto::from)
        .collect::<Vec<_>>()
        .await;
    Ok(Json(rows))
}

pub async fn sports(State(state): State<AppState>) -> Json<Vec<SportDto>> {
    Json(state.engine.list_sports().into_iter().map(SportDto::from).collect())
}
