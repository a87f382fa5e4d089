//! Rental request endpoints: open sessions and submitted requests

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::Multipart;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        rental::{RentalQuery, UpdateRentalStatus},
        DraftPatch, Photo, PhotoSlot, RentalRequest,
    },
    services::rentals::RentalSession,
};

/// Multipart body of a photo upload. The first file part is used.
#[derive(ToSchema)]
pub struct PhotoUpload {
    #[schema(value_type = String, format = Binary)]
    pub photo: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Get the current state of a rental session
#[utoipa::path(
    get,
    path = "/rental-sessions/{id}",
    tag = "rentals",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session state", body = RentalSession),
        (status = 404, description = "Session not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_session(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RentalSession>> {
    let session = state.services.rentals.get_session(id).await?;
    Ok(Json(session))
}

/// Update draft fields. Only fields present in the body change.
#[utoipa::path(
    patch,
    path = "/rental-sessions/{id}",
    tag = "rentals",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = DraftPatch,
    responses(
        (status = 200, description = "Draft updated", body = RentalSession),
        (status = 404, description = "Session not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Session is submitting or closed", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_session(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<DraftPatch>,
) -> AppResult<Json<RentalSession>> {
    let session = state.services.rentals.update_draft(id, patch).await?;
    Ok(Json(session))
}

/// Discard a rental session
#[utoipa::path(
    delete,
    path = "/rental-sessions/{id}",
    tag = "rentals",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 204, description = "Session discarded"),
        (status = 404, description = "Session not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Submission in progress", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel_session(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.rentals.cancel(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Validate the current step and advance to the next one
#[utoipa::path(
    post,
    path = "/rental-sessions/{id}/next",
    tag = "rentals",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Advanced", body = RentalSession),
        (status = 409, description = "Last step, photo upload pending or session closed", body = crate::error::ErrorResponse),
        (status = 422, description = "Current step has invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn next_step(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RentalSession>> {
    let session = state.services.rentals.next(id).await?;
    Ok(Json(session))
}

/// Go back one step, keeping entered values
#[utoipa::path(
    post,
    path = "/rental-sessions/{id}/back",
    tag = "rentals",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Moved back", body = RentalSession),
        (status = 409, description = "First step or session closed", body = crate::error::ErrorResponse)
    )
)]
pub async fn previous_step(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RentalSession>> {
    let session = state.services.rentals.back(id).await?;
    Ok(Json(session))
}

/// Upload a verification photo
#[utoipa::path(
    put,
    path = "/rental-sessions/{id}/photos/{slot}",
    tag = "rentals",
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("slot" = PhotoSlot, Path, description = "user or equipment-location")
    ),
    request_body(content = PhotoUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Photo attached", body = RentalSession),
        (status = 400, description = "Malformed upload", body = crate::error::ErrorResponse),
        (status = 409, description = "Upload superseded or session closed", body = crate::error::ErrorResponse),
        (status = 422, description = "Not an image or too large", body = crate::error::ErrorResponse)
    )
)]
pub async fn upload_photo(
    State(state): State<crate::AppState>,
    Path((id, slot)): Path<(Uuid, String)>,
    multipart: Multipart,
) -> AppResult<Json<RentalSession>> {
    let slot = parse_slot(&slot)?;
    let limit = state.config.rentals.max_photo_bytes;

    let session = state
        .services
        .rentals
        .attach_photo(id, slot, read_photo(multipart, limit))
        .await?;
    Ok(Json(session))
}

fn parse_slot(slot: &str) -> AppResult<PhotoSlot> {
    PhotoSlot::from_str(slot).map_err(|_| AppError::BadRequest(format!("Unknown photo slot '{}'", slot)))
}

/// Read the first file part. Reading stops once the payload exceeds `limit`;
/// the oversized photo is then rejected by the workflow.
async fn read_photo(mut multipart: Multipart, limit: usize) -> AppResult<Photo> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?
    {
        if field.file_name().is_none() && field.name() != Some("photo") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?
        {
            bytes.extend_from_slice(&chunk);
            if bytes.len() > limit {
                break;
            }
        }
        return Ok(Photo::new(content_type, bytes));
    }
    Err(AppError::BadRequest("Upload contains no photo".to_string()))
}

/// Submit the rental request
#[utoipa::path(
    post,
    path = "/rental-sessions/{id}/submit",
    tag = "rentals",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Request submitted", body = RentalSession),
        (status = 409, description = "Not on the verification step or already submitting", body = crate::error::ErrorResponse),
        (status = 422, description = "Request has invalid fields", body = crate::error::ErrorResponse),
        (status = 502, description = "Submission failed; the session can be submitted again", body = crate::error::ErrorResponse)
    )
)]
pub async fn submit_session(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RentalSession>> {
    let session = state.services.rentals.submit(id).await?;
    Ok(Json(session))
}

// ---------------------------------------------------------------------------
// Submitted requests
// ---------------------------------------------------------------------------

/// List submitted rental requests
#[utoipa::path(
    get,
    path = "/rentals",
    tag = "rentals",
    params(RentalQuery),
    responses(
        (status = 200, description = "Rental requests", body = Vec<RentalRequest>)
    )
)]
pub async fn list_rentals(
    State(state): State<crate::AppState>,
    Query(query): Query<RentalQuery>,
) -> AppResult<Json<Vec<RentalRequest>>> {
    let requests = state.services.rentals.list_requests(&query).await?;
    Ok(Json(requests))
}

/// Get a submitted rental request
#[utoipa::path(
    get,
    path = "/rentals/{request_id}",
    tag = "rentals",
    params(("request_id" = String, Path, description = "Request ID, e.g. REQ-...")),
    responses(
        (status = 200, description = "Rental request", body = RentalRequest),
        (status = 404, description = "Request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_rental(
    State(state): State<crate::AppState>,
    Path(request_id): Path<String>,
) -> AppResult<Json<RentalRequest>> {
    let request = state.services.rentals.get_request(&request_id).await?;
    Ok(Json(request))
}

/// Download a verification photo of a submitted request
#[utoipa::path(
    get,
    path = "/rentals/{request_id}/photos/{slot}",
    tag = "rentals",
    params(
        ("request_id" = String, Path, description = "Request ID"),
        ("slot" = PhotoSlot, Path, description = "user or equipment-location")
    ),
    responses(
        (status = 200, description = "Photo bytes with their uploaded content type", content_type = "image/*", body = Vec<u8>),
        (status = 400, description = "Unknown photo slot", body = crate::error::ErrorResponse),
        (status = 404, description = "Request or photo not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_rental_photo(
    State(state): State<crate::AppState>,
    Path((request_id, slot)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let slot = parse_slot(&slot)?;
    let photo = state.services.rentals.get_request_photo(&request_id, slot).await?;
    Ok(([(header::CONTENT_TYPE, photo.content_type)], photo.bytes))
}

/// Approve, reject or complete a rental request
#[utoipa::path(
    put,
    path = "/rentals/{request_id}/status",
    tag = "rentals",
    params(("request_id" = String, Path, description = "Request ID")),
    request_body = UpdateRentalStatus,
    responses(
        (status = 200, description = "Status updated", body = RentalRequest),
        (status = 404, description = "Request not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_rental_status(
    State(state): State<crate::AppState>,
    Path(request_id): Path<String>,
    Json(data): Json<UpdateRentalStatus>,
) -> AppResult<Json<RentalRequest>> {
    let request = state
        .services
        .rentals
        .update_status(&request_id, data.status)
        .await?;
    Ok(Json(request))
}
