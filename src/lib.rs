use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod repository;
pub mod scope;
pub mod storage;

// Page, public, authenticated and admin routers.
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, pages, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use identity::{IdentityState, MockIdentityProvider, SupabaseIdentityProvider};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for the JSON API, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::sign_in, handlers::sign_out, handlers::get_me,
        handlers::create_qr_labels, handlers::submit_property, handlers::list_properties,
        handlers::search_properties, handlers::get_property, handlers::append_status,
        handlers::get_status_log, handlers::request_photo_upload, handlers::get_stats,
        handlers::list_stations, handlers::list_racks, handlers::create_rack,
        handlers::list_boxes, handlers::create_box, handlers::list_officers,
        handlers::create_officer, handlers::update_officer, handlers::create_station,
        handlers::update_station
    ),
    components(
        schemas(
            models::Officer, models::Role, models::Station, models::Rack, models::StorageBox,
            models::PropertyRecord, models::StatusLogEntry, models::CustodyStatus,
            models::SignInRequest, models::CreateOfficerRequest, models::UpdateOfficerRequest,
            models::UpdateStationRequest, models::CreateLabelRequest, models::QrLabel,
            models::SubmitPropertyRequest, models::AppendStatusRequest,
            models::CreateRackRequest, models::CreateBoxRequest, models::PhotoUploadRequest,
            models::PhotoUploadResponse, models::DashboardStats, scope::SearchCategory,
        )
    ),
    tags(
        (name = "malkhana", description = "Case property (Malkhana) registry API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Immutable container of the service's collaborators, cloned into every request.
/// There is no other shared state between requests.
#[derive(Clone)]
pub struct AppState {
    /// Officer registry, property registry, status log and station metadata.
    pub repo: RepositoryState,
    /// Photograph storage.
    pub storage: StorageState,
    /// Password verification at sign-in.
    pub identity: IdentityState,
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the JSON API. Extracting `AuthUser` runs the token verifier; on failure the
/// extractor rejects with `401` before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles pages (behind the gate), the public and authenticated API, the admin API,
/// and the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Page navigations: token verifier, then record resolver on the landing route.
        .merge(pages::page_routes().route_layer(middleware::from_fn_with_state(
            state.clone(),
            gate::gate_middleware,
        )))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Role checks for admin routes happen in the handlers.
        .nest(
            "/api/admin",
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Request span carrying the `x-request-id`, so every log line of a request correlates.
/// Only the path is recorded: query strings can carry QR identifiers.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
    )
}
