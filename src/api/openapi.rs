//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{equipment, health, rentals};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Samuday Shakti Equipment Rental API",
        version = "0.3.0",
        description = "Equipment listings and rental requests for FPO members",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::open_rental,
        // Rental sessions
        rentals::get_session,
        rentals::update_session,
        rentals::cancel_session,
        rentals::next_step,
        rentals::previous_step,
        rentals::upload_photo,
        rentals::submit_session,
        // Rental requests
        rentals::list_rentals,
        rentals::get_rental,
        rentals::get_rental_photo,
        rentals::update_rental_status,
    ),
    components(
        schemas(
            // Equipment
            crate::models::Equipment,
            crate::models::CreateEquipment,
            crate::models::Rate,
            crate::models::RateUnit,
            crate::models::Availability,
            crate::models::EquipmentType,
            // Rentals
            crate::services::rentals::RentalSession,
            crate::rental::WorkflowView,
            crate::rental::CostEstimate,
            crate::rental::FormStep,
            crate::models::DraftPatch,
            crate::models::DeliveryOption,
            crate::models::IdType,
            crate::models::PhotoSlot,
            crate::models::PhotoRef,
            crate::models::Contact,
            crate::models::Identity,
            crate::models::RentalPeriod,
            crate::models::RentalRequest,
            crate::models::RentalStatus,
            crate::models::Receipt,
            crate::models::rental::UpdateRentalStatus,
            rentals::PhotoUpload,
            // Health
            health::HealthResponse,
            health::ReadinessResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "equipment", description = "Equipment catalog"),
        (name = "rentals", description = "Rental requests")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
