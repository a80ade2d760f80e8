use crate::{
    AppState,
    auth::{self, AuthUser},
    error::ApiError,
    models::{
        AppendStatusRequest, CreateBoxRequest, CreateLabelRequest, CreateOfficerRequest,
        CreateRackRequest, DashboardStats, NewStatusEntry, Officer, PhotoUploadRequest,
        PhotoUploadResponse, PropertyRecord, QrLabel, Rack, Role, SignInRequest, Station,
        StatusLogEntry, StorageBox, SubmitPropertyRequest, UpdateOfficerRequest,
        UpdateStationRequest,
    },
    scope::{PropertyQuery, SearchCategory},
    storage,
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use uuid::Uuid;

/// Upper bound on labels generated per request.
pub const MAX_LABELS_PER_REQUEST: u32 = 100;

/// SearchParams
///
/// Query parameters for `GET /api/properties/search`.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct SearchParams {
    pub category: SearchCategory,
    /// Free text, or `YYYY-MM-DD` for the date categories.
    pub value: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn new_property_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn require_writer(user: &AuthUser) -> Result<(), ApiError> {
    if user.role.can_write() {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

fn require_admin(user: &AuthUser) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Fetches a complete record the caller is allowed to see. Records outside the caller's
/// station are reported as missing, not forbidden.
async fn visible_property(
    state: &AppState,
    user: &AuthUser,
    property_id: &str,
) -> Result<PropertyRecord, ApiError> {
    state
        .repo
        .get_property(property_id)
        .await?
        .filter(|record| user.scope().allows(&record.station))
        .ok_or(ApiError::NotFound)
}

// --- Session ---

/// sign_in
///
/// [Public Route] Checks the password with the identity provider, then requires a row in
/// the officer registry. The new credential carries the registry's role and station.
#[utoipa::path(
    post,
    path = "/api/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = Officer),
        (status = 401, description = "Rejected")
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Response, ApiError> {
    let email = normalize_email(&payload.email);

    match state.identity.verify_password(&email, &payload.password).await {
        Ok(true) => {}
        Ok(false) => return Err(ApiError::Unauthorized),
        Err(e) => {
            tracing::error!(error = %e, "identity provider failed during sign-in");
            return Err(ApiError::Upstream);
        }
    }

    let officer = state
        .repo
        .get_officer(&email)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    if officer.role.parse::<Role>().is_err() {
        return Err(ApiError::Unauthorized);
    }

    let token = auth::issue_token(&officer, &state.config.jwt_secret, state.config.token_ttl_days)
        .map_err(|e| {
            tracing::error!(error = %e, "failed to sign session credential");
            ApiError::Internal
        })?;
    let cookie = auth::session_cookie(&token, &state.config).ok_or(ApiError::Internal)?;

    tracing::info!(email = %officer.email, station = %officer.station, "officer signed in");
    Ok(([(header::SET_COOKIE, cookie)], Json(officer)).into_response())
}

/// sign_out
///
/// [Public Route] Clears the session cookie.
#[utoipa::path(
    post,
    path = "/api/auth/sign-out",
    responses((status = 204, description = "Signed out"))
)]
pub async fn sign_out() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, auth::clear_session_cookie())],
    )
}

/// get_me
///
/// [Authenticated Route] The verified identity, as currently held by the registry.
#[utoipa::path(
    get,
    path = "/api/me",
    responses((status = 200, description = "Current officer", body = Officer))
)]
pub async fn get_me(user: AuthUser) -> Json<Officer> {
    Json(Officer {
        email: user.email,
        name: user.name,
        role: user.role.as_str().to_string(),
        station: user.station,
    })
}

// --- Property Registry ---

/// create_qr_labels
///
/// [Authenticated Route] Pre-generates empty records whose `qr_id` is the landing URL to be
/// printed. Admins may label any station, station admins only their own.
#[utoipa::path(
    post,
    path = "/api/qr-labels",
    request_body = CreateLabelRequest,
    responses((status = 201, description = "Labels created", body = [QrLabel]))
)]
pub async fn create_qr_labels(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateLabelRequest>,
) -> Result<(StatusCode, Json<Vec<QrLabel>>), ApiError> {
    if payload.count == 0 || payload.count > MAX_LABELS_PER_REQUEST {
        return Err(ApiError::BadRequest(format!(
            "count must be between 1 and {MAX_LABELS_PER_REQUEST}"
        )));
    }
    if !user.can_manage_station(&payload.station) {
        return Err(ApiError::Forbidden);
    }
    if state.repo.get_station(&payload.station).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let qr_ids = (0..payload.count)
        .map(|_| format!("{}/?qr={}", state.config.public_base_url, Uuid::new_v4()))
        .collect();
    let records = state.repo.create_qr_slots(&payload.station, qr_ids).await?;

    tracing::info!(station = %payload.station, count = records.len(), "qr labels generated");
    let labels = records
        .into_iter()
        .map(|record| QrLabel {
            url: record.qr_id,
            station: record.station,
        })
        .collect();
    Ok((StatusCode::CREATED, Json(labels)))
}

/// submit_property
///
/// [Authenticated Route] Completes the record behind a printed label. The durable
/// `property_id` is assigned here; from then on scanning the label opens the record.
#[utoipa::path(
    post,
    path = "/api/properties/submit",
    request_body = SubmitPropertyRequest,
    responses(
        (status = 201, description = "Submitted", body = PropertyRecord),
        (status = 404, description = "Unknown label"),
        (status = 409, description = "Already submitted")
    )
)]
pub async fn submit_property(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmitPropertyRequest>,
) -> Result<(StatusCode, Json<PropertyRecord>), ApiError> {
    require_writer(&user)?;

    let slot = state
        .repo
        .find_property_by_qr_id(&payload.qr_id)
        .await?
        .filter(|record| user.scope().allows(&record.station))
        .ok_or(ApiError::NotFound)?;
    if slot.completed_id().is_some() {
        return Err(ApiError::Conflict("record already submitted"));
    }

    if let Some(rack_id) = payload.rack_id {
        let rack = state.repo.get_rack(rack_id).await?;
        if rack.is_none_or(|rack| rack.station != slot.station) {
            return Err(ApiError::BadRequest("rack does not belong to this station".into()));
        }
    }
    if let Some(box_id) = payload.box_id {
        let rack_id = payload
            .rack_id
            .ok_or_else(|| ApiError::BadRequest("box requires a rack".into()))?;
        let boxes = state.repo.list_boxes(rack_id).await?;
        if !boxes.iter().any(|b| b.id == box_id) {
            return Err(ApiError::BadRequest("box does not belong to this rack".into()));
        }
    }

    let property_id = new_property_id();
    let record = state
        .repo
        .submit_property(&property_id, payload, &user.email)
        .await?
        .ok_or(ApiError::Conflict("record already submitted"))?;

    tracing::info!(%property_id, station = %record.station, officer = %user.email, "property submitted");
    Ok((StatusCode::CREATED, Json(record)))
}

/// list_properties
///
/// [Authenticated Route] Complete records visible to the caller, newest first.
#[utoipa::path(
    get,
    path = "/api/properties",
    responses((status = 200, description = "Records", body = [PropertyRecord]))
)]
pub async fn list_properties(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PropertyRecord>>, ApiError> {
    let query = PropertyQuery::list(user.scope());
    Ok(Json(state.repo.query_properties(&query).await?))
}

/// search_properties
///
/// [Authenticated Route] Category search, narrowed to the caller's station unless admin.
#[utoipa::path(
    get,
    path = "/api/properties/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching records", body = [PropertyRecord]),
        (status = 400, description = "Unknown category or malformed value"),
        (status = 500, description = "Query failed")
    )
)]
pub async fn search_properties(
    user: AuthUser,
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<PropertyRecord>>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let query = PropertyQuery::search(user.scope(), params.category, &params.value)?;
    Ok(Json(state.repo.query_properties(&query).await?))
}

/// get_property
///
/// [Authenticated Route] One record by its durable id.
#[utoipa::path(
    get,
    path = "/api/properties/{property_id}",
    params(("property_id" = String, Path, description = "Property ID")),
    responses(
        (status = 200, description = "Found", body = PropertyRecord),
        (status = 404, description = "Not found or outside the caller's station")
    )
)]
pub async fn get_property(
    user: AuthUser,
    State(state): State<AppState>,
    Path(property_id): Path<String>,
) -> Result<Json<PropertyRecord>, ApiError> {
    Ok(Json(visible_property(&state, &user, &property_id).await?))
}

/// append_status
///
/// [Authenticated Route] Appends a custody transition. Entries are never edited.
#[utoipa::path(
    post,
    path = "/api/properties/{property_id}/status",
    params(("property_id" = String, Path, description = "Property ID")),
    request_body = AppendStatusRequest,
    responses((status = 201, description = "Appended", body = StatusLogEntry))
)]
pub async fn append_status(
    user: AuthUser,
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    Json(payload): Json<AppendStatusRequest>,
) -> Result<(StatusCode, Json<StatusLogEntry>), ApiError> {
    require_writer(&user)?;
    let record = visible_property(&state, &user, &property_id).await?;

    let entry = state
        .repo
        .append_status(NewStatusEntry {
            property_id: property_id.clone(),
            status: payload.status.as_str().to_string(),
            remarks: payload.remarks.filter(|r| !r.trim().is_empty()),
            officer_email: user.email.clone(),
        })
        .await?;

    tracing::info!(%property_id, station = %record.station, status = %entry.status, "status appended");
    Ok((StatusCode::CREATED, Json(entry)))
}

/// get_status_log
///
/// [Authenticated Route] Chronological custody history of a record.
#[utoipa::path(
    get,
    path = "/api/properties/{property_id}/status",
    params(("property_id" = String, Path, description = "Property ID")),
    responses((status = 200, description = "History", body = [StatusLogEntry]))
)]
pub async fn get_status_log(
    user: AuthUser,
    State(state): State<AppState>,
    Path(property_id): Path<String>,
) -> Result<Json<Vec<StatusLogEntry>>, ApiError> {
    visible_property(&state, &user, &property_id).await?;
    Ok(Json(state.repo.get_status_log(&property_id).await?))
}

/// request_photo_upload
///
/// [Authenticated Route] Presigned URL for attaching a photograph to a record. The object
/// key is recorded on the record before the client uploads.
#[utoipa::path(
    post,
    path = "/api/properties/{property_id}/photos",
    params(("property_id" = String, Path, description = "Property ID")),
    request_body = PhotoUploadRequest,
    responses((status = 200, description = "Upload URL", body = PhotoUploadResponse))
)]
pub async fn request_photo_upload(
    user: AuthUser,
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    Json(payload): Json<PhotoUploadRequest>,
) -> Result<Json<PhotoUploadResponse>, ApiError> {
    require_writer(&user)?;
    if !payload.file_type.starts_with("image/") {
        return Err(ApiError::BadRequest("only image uploads are accepted".into()));
    }
    visible_property(&state, &user, &property_id).await?;

    let key = storage::photo_key(&property_id, &payload.filename, Uuid::new_v4());
    let upload_url = state
        .storage
        .get_presigned_upload_url(&key, &payload.file_type)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "presigned url generation failed");
            ApiError::Upstream
        })?;

    state
        .repo
        .add_photo(&property_id, &key)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(PhotoUploadResponse {
        upload_url,
        resource_key: key,
    }))
}

/// get_stats
///
/// [Authenticated Route] Dashboard counters within the caller's scope.
#[utoipa::path(
    get,
    path = "/api/stats",
    responses((status = 200, description = "Stats", body = DashboardStats))
)]
pub async fn get_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(state.repo.get_stats(&user.scope()).await?))
}

// --- Stations & Storage ---

/// list_stations
///
/// [Authenticated Route] All thanas. Station names are not sensitive; every role may list them.
#[utoipa::path(
    get,
    path = "/api/stations",
    responses((status = 200, description = "Stations", body = [Station]))
)]
pub async fn list_stations(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Station>>, ApiError> {
    Ok(Json(state.repo.list_stations().await?))
}

/// list_racks
#[utoipa::path(
    get,
    path = "/api/stations/{name}/racks",
    params(("name" = String, Path, description = "Station name")),
    responses((status = 200, description = "Racks", body = [Rack]))
)]
pub async fn list_racks(
    user: AuthUser,
    State(state): State<AppState>,
    Path(station): Path<String>,
) -> Result<Json<Vec<Rack>>, ApiError> {
    if !user.scope().allows(&station) {
        return Err(ApiError::NotFound);
    }
    Ok(Json(state.repo.list_racks(&station).await?))
}

/// create_rack
#[utoipa::path(
    post,
    path = "/api/stations/{name}/racks",
    params(("name" = String, Path, description = "Station name")),
    request_body = CreateRackRequest,
    responses((status = 201, description = "Created", body = Rack))
)]
pub async fn create_rack(
    user: AuthUser,
    State(state): State<AppState>,
    Path(station): Path<String>,
    Json(payload): Json<CreateRackRequest>,
) -> Result<(StatusCode, Json<Rack>), ApiError> {
    if !user.can_manage_station(&station) {
        return Err(ApiError::Forbidden);
    }
    let label = payload.label.trim();
    if label.is_empty() {
        return Err(ApiError::BadRequest("label must not be empty".into()));
    }
    if state.repo.get_station(&station).await?.is_none() {
        return Err(ApiError::NotFound);
    }
    let rack = state.repo.create_rack(&station, label).await?;
    Ok((StatusCode::CREATED, Json(rack)))
}

/// list_boxes
#[utoipa::path(
    get,
    path = "/api/racks/{id}/boxes",
    params(("id" = i64, Path, description = "Rack ID")),
    responses((status = 200, description = "Boxes", body = [StorageBox]))
)]
pub async fn list_boxes(
    user: AuthUser,
    State(state): State<AppState>,
    Path(rack_id): Path<i64>,
) -> Result<Json<Vec<StorageBox>>, ApiError> {
    state
        .repo
        .get_rack(rack_id)
        .await?
        .filter(|rack| user.scope().allows(&rack.station))
        .ok_or(ApiError::NotFound)?;
    Ok(Json(state.repo.list_boxes(rack_id).await?))
}

/// create_box
#[utoipa::path(
    post,
    path = "/api/racks/{id}/boxes",
    params(("id" = i64, Path, description = "Rack ID")),
    request_body = CreateBoxRequest,
    responses((status = 201, description = "Created", body = StorageBox))
)]
pub async fn create_box(
    user: AuthUser,
    State(state): State<AppState>,
    Path(rack_id): Path<i64>,
    Json(payload): Json<CreateBoxRequest>,
) -> Result<(StatusCode, Json<StorageBox>), ApiError> {
    let rack = state
        .repo
        .get_rack(rack_id)
        .await?
        .filter(|rack| user.scope().allows(&rack.station))
        .ok_or(ApiError::NotFound)?;
    if !user.can_manage_station(&rack.station) {
        return Err(ApiError::Forbidden);
    }
    let label = payload.label.trim();
    if label.is_empty() {
        return Err(ApiError::BadRequest("label must not be empty".into()));
    }
    let storage_box = state.repo.create_box(rack_id, label).await?;
    Ok((StatusCode::CREATED, Json(storage_box)))
}

// --- Administration ---

/// list_officers
///
/// [Admin Route] The whole officer registry.
#[utoipa::path(
    get,
    path = "/api/admin/officers",
    responses((status = 200, description = "Officers", body = [Officer]))
)]
pub async fn list_officers(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Officer>>, ApiError> {
    require_admin(&user)?;
    Ok(Json(state.repo.list_officers().await?))
}

/// create_officer
///
/// [Admin Route] Grants access. The officer still needs an identity-provider account to sign in.
#[utoipa::path(
    post,
    path = "/api/admin/officers",
    request_body = CreateOfficerRequest,
    responses(
        (status = 201, description = "Created", body = Officer),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_officer(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateOfficerRequest>,
) -> Result<(StatusCode, Json<Officer>), ApiError> {
    require_admin(&user)?;
    let email = normalize_email(&payload.email);
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("invalid email".into()));
    }
    if state.repo.get_station(&payload.station).await?.is_none() {
        return Err(ApiError::BadRequest("unknown station".into()));
    }

    let officer = Officer {
        email,
        name: payload.name.trim().to_string(),
        role: payload.role.as_str().to_string(),
        station: payload.station,
    };
    let created = state
        .repo
        .create_officer(officer)
        .await?
        .ok_or(ApiError::Conflict("officer already exists"))?;

    tracing::info!(email = %created.email, role = %created.role, by = %user.email, "officer created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// update_officer
///
/// [Admin Route] Changes take effect on the officer's next request, since every request
/// re-reads the registry.
#[utoipa::path(
    put,
    path = "/api/admin/officers/{email}",
    params(("email" = String, Path, description = "Officer email")),
    request_body = UpdateOfficerRequest,
    responses((status = 200, description = "Updated", body = Officer))
)]
pub async fn update_officer(
    user: AuthUser,
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(payload): Json<UpdateOfficerRequest>,
) -> Result<Json<Officer>, ApiError> {
    require_admin(&user)?;
    if let Some(station) = &payload.station {
        if state.repo.get_station(station).await?.is_none() {
            return Err(ApiError::BadRequest("unknown station".into()));
        }
    }
    let updated = state
        .repo
        .update_officer(&normalize_email(&email), payload)
        .await?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(email = %updated.email, role = %updated.role, by = %user.email, "officer updated");
    Ok(Json(updated))
}

/// create_station
#[utoipa::path(
    post,
    path = "/api/admin/stations",
    request_body = Station,
    responses(
        (status = 201, description = "Created", body = Station),
        (status = 409, description = "Station exists")
    )
)]
pub async fn create_station(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<Station>,
) -> Result<(StatusCode, Json<Station>), ApiError> {
    require_admin(&user)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("station name must not be empty".into()));
    }
    let created = state
        .repo
        .create_station(Station { name, ..payload })
        .await?
        .ok_or(ApiError::Conflict("station already exists"))?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// update_station
#[utoipa::path(
    put,
    path = "/api/admin/stations/{name}",
    params(("name" = String, Path, description = "Station name")),
    request_body = UpdateStationRequest,
    responses((status = 200, description = "Updated", body = Station))
)]
pub async fn update_station(
    user: AuthUser,
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<UpdateStationRequest>,
) -> Result<Json<Station>, ApiError> {
    require_admin(&user)?;
    let updated = state
        .repo
        .update_station(&name, payload)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(updated))
}

// --- Pages ---
//
// Static shells; the data is fetched from `/api`. These routes sit behind the gate.

const LANDING_PAGE: &str = r#"<!doctype html>
<html><head><meta charset="utf-8"><title>Malkhana</title></head>
<body><main id="app" data-page="landing"><h1>Register seized property</h1></main></body></html>"#;

const SIGN_IN_PAGE: &str = r#"<!doctype html>
<html><head><meta charset="utf-8"><title>Malkhana - Sign in</title></head>
<body><main id="app" data-page="signin"><h1>Sign in</h1></main></body></html>"#;

const ADMIN_PAGE: &str = r#"<!doctype html>
<html><head><meta charset="utf-8"><title>Malkhana - Dashboard</title></head>
<body><main id="app" data-page="admin"><h1>Dashboard</h1></main></body></html>"#;

const PROPERTY_PAGE: &str = r#"<!doctype html>
<html><head><meta charset="utf-8"><title>Malkhana - Property</title></head>
<body><main id="app" data-page="property"><h1>Property record</h1></main></body></html>"#;

pub async fn landing_page() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

pub async fn sign_in_page() -> Html<&'static str> {
    Html(SIGN_IN_PAGE)
}

pub async fn admin_page() -> Html<&'static str> {
    Html(ADMIN_PAGE)
}

pub async fn property_page() -> Html<&'static str> {
    Html(PROPERTY_PAGE)
}
