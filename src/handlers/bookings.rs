use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{
    Booking, BookingPatch, BookingSearch, BookingStatus, NewBooking, ProviderNote, Relation,
    StatusUpdate,
};
use crate::state::AppState;

// POST /bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewBooking>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let Json(input) = payload?;
    let booking = state.bookings.create(input).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /bookings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub status: Option<String>,
    pub resource_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub async fn search_bookings(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let Query(query) = query?;
    let search = parse_search(query)?;
    let bookings = state.repo.search(&search).await?;
    Ok(Json(bookings))
}

fn parse_search(query: SearchQuery) -> Result<BookingSearch, AppError> {
    let start_date = query
        .start_date
        .as_deref()
        .map(|s| parse_instant("startDate", s))
        .transpose()?;
    let end_date = query
        .end_date
        .as_deref()
        .map(|s| parse_instant("endDate", s))
        .transpose()?;

    if let (Some(start), Some(end)) = (&start_date, &end_date) {
        if start >= end {
            return Err(AppError::Validation(
                "endDate: must be after startDate".to_string(),
            ));
        }
    }

    let status = match query.status.as_deref() {
        Some(s) => Some(BookingStatus::parse(s).ok_or_else(|| {
            AppError::Validation(
                "status: must be one of PENDING, CONFIRMED, CANCELLED, REJECTED".to_string(),
            )
        })?),
        None => None,
    };

    Ok(BookingSearch {
        status,
        resource_id: query.resource_id.filter(|r| !r.is_empty()),
        start_date,
        end_date,
    })
}

fn parse_instant(field: &str, value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::Validation(format!("{field}: expected an RFC 3339 timestamp")))
}

// GET /bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.get(&id).await?))
}

// PATCH /bookings/:id
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<BookingPatch>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let Json(patch) = payload?;
    Ok(Json(state.bookings.update(&id, patch).await?))
}

// PATCH /bookings/:id/status
pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let Json(update) = payload?;
    Ok(Json(state.bookings.update_status(&id, update).await?))
}

// DELETE /bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.delete(&id).await?))
}

// POST /bookings/:id/accept
pub async fn accept_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Booking>, AppError> {
    let note = provider_note(&body)?;
    Ok(Json(state.bookings.accept(&id, note).await?))
}

// POST /bookings/:id/reject
pub async fn reject_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Booking>, AppError> {
    let note = provider_note(&body)?;
    Ok(Json(state.bookings.reject(&id, note).await?))
}

// POST /bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Booking>, AppError> {
    let note = provider_note(&body)?;
    Ok(Json(state.bookings.cancel(&id, note).await?))
}

// The body of accept, reject and cancel may be left out entirely, but one
// that is present must be a valid `ProviderNote`.
fn provider_note(body: &[u8]) -> Result<Option<String>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let parsed: ProviderNote = serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("invalid request body: {e}")))?;
    Ok(parsed.provider_note)
}

// GET /bookings/{requester,provider,resource,skill}/:id
async fn list_related(
    state: &AppState,
    relation: Relation,
    key: &str,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.repo.find_by(relation, key).await?))
}

pub async fn by_requester(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    list_related(&state, Relation::Requester, &id).await
}

pub async fn by_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    list_related(&state, Relation::Provider, &id).await
}

pub async fn by_resource(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    list_related(&state, Relation::Resource, &id).await
}

pub async fn by_skill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    list_related(&state, Relation::Skill, &id).await
}

// GET /bookings/history/:id
pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.repo.history(&id).await?))
}
