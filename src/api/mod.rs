//! API handlers for the rental REST endpoints

pub mod equipment;
pub mod health;
pub mod openapi;
pub mod rentals;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Headroom for multipart boundaries and headers around a photo
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload_limit = state.config.rentals.max_photo_bytes + UPLOAD_OVERHEAD_BYTES;

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Equipment catalog
        .route(
            "/equipment",
            get(equipment::list_equipment).post(equipment::create_equipment),
        )
        .route("/equipment/:id", get(equipment::get_equipment))
        .route("/equipment/:id/rentals", post(equipment::open_rental))
        // Rental sessions
        .route(
            "/rental-sessions/:id",
            get(rentals::get_session)
                .patch(rentals::update_session)
                .delete(rentals::cancel_session),
        )
        .route("/rental-sessions/:id/next", post(rentals::next_step))
        .route("/rental-sessions/:id/back", post(rentals::previous_step))
        .route(
            "/rental-sessions/:id/photos/:slot",
            put(rentals::upload_photo).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/rental-sessions/:id/submit", post(rentals::submit_session))
        // Submitted requests
        .route("/rentals", get(rentals::list_rentals))
        .route("/rentals/:request_id", get(rentals::get_rental))
        .route("/rentals/:request_id/photos/:slot", get(rentals::get_rental_photo))
        .route("/rentals/:request_id/status", put(rentals::update_rental_status))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
