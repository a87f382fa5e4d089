//! Equipment catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{CreateEquipment, Equipment, EquipmentQuery},
    services::rentals::RentalSession,
};

/// List equipment, optionally filtered by search text and type
#[utoipa::path(
    get,
    path = "/equipment",
    tag = "equipment",
    params(EquipmentQuery),
    responses(
        (status = 200, description = "Equipment list", body = Vec<Equipment>)
    )
)]
pub async fn list_equipment(
    State(state): State<crate::AppState>,
    Query(query): Query<EquipmentQuery>,
) -> AppResult<Json<Vec<Equipment>>> {
    let equipment = state.services.equipment.list(&query).await?;
    Ok(Json(equipment))
}

/// Get equipment by ID
#[utoipa::path(
    get,
    path = "/equipment/{id}",
    tag = "equipment",
    params(("id" = i64, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Equipment details", body = Equipment),
        (status = 404, description = "Equipment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_equipment(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Equipment>> {
    let equipment = state.services.equipment.get_by_id(id).await?;
    Ok(Json(equipment))
}

/// List a new piece of equipment for rent
#[utoipa::path(
    post,
    path = "/equipment",
    tag = "equipment",
    request_body = CreateEquipment,
    responses(
        (status = 201, description = "Equipment listed", body = Equipment),
        (status = 400, description = "Invalid listing", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_equipment(
    State(state): State<crate::AppState>,
    Json(data): Json<CreateEquipment>,
) -> AppResult<(StatusCode, Json<Equipment>)> {
    let equipment = state.services.equipment.create(data).await?;
    Ok((StatusCode::CREATED, Json(equipment)))
}

/// Start a rental request for this equipment
#[utoipa::path(
    post,
    path = "/equipment/{id}/rentals",
    tag = "rentals",
    params(("id" = i64, Path, description = "Equipment ID")),
    responses(
        (status = 201, description = "Rental session opened", body = RentalSession),
        (status = 404, description = "Equipment not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Equipment is not available", body = crate::error::ErrorResponse)
    )
)]
pub async fn open_rental(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
) -> AppResult<(StatusCode, Json<RentalSession>)> {
    let session = state.services.rentals.open_session(id).await?;
    Ok((StatusCode::CREATED, Json(session)))
}
