use crate::{AppState, gate, handlers};
use axum::{Router, routing::get};

/// Page Router
///
/// Every route here is subject to the gate: unauthenticated visitors are sent to sign-in,
/// and the landing route additionally resolves printed QR URLs to their records.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        // GET /?qr=...
        // Landing page; the target of every printed label.
        .route(gate::LANDING_ROUTE, get(handlers::landing_page))
        .route(gate::SIGN_IN_ROUTE, get(handlers::sign_in_page))
        .route(gate::ADMIN_LANDING_ROUTE, get(handlers::admin_page))
        .route("/property/{property_id}", get(handlers::property_page))
}
