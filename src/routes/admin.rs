use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router
///
/// Officer registry and station management, nested under `/api/admin`. Authentication is
/// applied as a layer; the `admin` role check is made inside each handler.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /api/admin/officers
        .route(
            "/officers",
            get(handlers::list_officers).post(handlers::create_officer),
        )
        // PUT /api/admin/officers/{email}
        // Role and station changes apply from the officer's next request.
        .route("/officers/{email}", put(handlers::update_officer))
        .route("/stations", axum::routing::post(handlers::create_station))
        .route("/stations/{name}", put(handlers::update_station))
}
