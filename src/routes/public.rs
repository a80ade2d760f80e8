use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router
///
/// Unauthenticated endpoints: health probe and the session endpoints.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        .route("/health", get(|| async { "ok" }))
        // POST /api/auth/sign-in
        // Password check, then officer registry check, then a fresh session cookie.
        .route("/api/auth/sign-in", post(handlers::sign_in))
        .route("/api/auth/sign-out", post(handlers::sign_out))
}
