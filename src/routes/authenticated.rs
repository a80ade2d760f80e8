use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router
///
/// JSON API for signed-in officers. Wrapped by `auth_middleware`, so every handler receives
/// a registry-verified `AuthUser`. Station scoping and write permissions are applied per
/// handler from that identity.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/api/me", get(handlers::get_me))
        .route("/api/stats", get(handlers::get_stats))
        // --- Labels & submission ---
        // POST /api/qr-labels
        // Pre-generates incomplete rows keyed by the landing URL to be printed.
        .route("/api/qr-labels", post(handlers::create_qr_labels))
        .route("/api/properties/submit", post(handlers::submit_property))
        // --- Retrieval ---
        .route("/api/properties", get(handlers::list_properties))
        .route("/api/properties/search", get(handlers::search_properties))
        .route("/api/properties/{property_id}", get(handlers::get_property))
        // --- Custody log & photographs ---
        .route(
            "/api/properties/{property_id}/status",
            get(handlers::get_status_log).post(handlers::append_status),
        )
        .route(
            "/api/properties/{property_id}/photos",
            post(handlers::request_photo_upload),
        )
        // --- Stations & storage ---
        .route("/api/stations", get(handlers::list_stations))
        .route(
            "/api/stations/{name}/racks",
            get(handlers::list_racks).post(handlers::create_rack),
        )
        .route(
            "/api/racks/{id}/boxes",
            get(handlers::list_boxes).post(handlers::create_box),
        )
}
