#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use malkhana::{
    AppConfig, AppState, InMemoryRepository, MockIdentityProvider, MockStorageService,
    auth::{self, Claims},
    create_router,
    models::{Officer, PropertyRecord, Station},
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-value-1234567890";
pub const BASE_URL: &str = "https://malkhana.test";
pub const PASSWORD: &str = "correct horse battery staple";

pub const ADMIN: &str = "admin@police.test";
pub const SHO_TWO: &str = "sho@thana2.test";
pub const VIEWER_TWO: &str = "constable@thana2.test";
pub const SHO_THREE: &str = "sho@thana3.test";

pub fn officer(email: &str, role: &str, station: &str) -> Officer {
    Officer {
        email: email.to_string(),
        name: format!("Officer {email}"),
        role: role.to_string(),
        station: station.to_string(),
    }
}

pub fn station(name: &str) -> Station {
    Station {
        name: name.to_string(),
        district: Some("Central".to_string()),
        address: None,
        phone: None,
    }
}

/// Three thanas with an admin, a station admin and a viewer.
pub fn seeded_repo() -> Arc<InMemoryRepository> {
    Arc::new(seeded_officers_and_stations())
}

fn seeded_officers_and_stations() -> InMemoryRepository {
    InMemoryRepository::new()
        .with_station(station("thana 1"))
        .with_station(station("thana 2"))
        .with_station(station("thana 3"))
        .with_officer(officer(ADMIN, "admin", "thana 1"))
        .with_officer(officer(SHO_TWO, "station-admin", "thana 2"))
        .with_officer(officer(VIEWER_TWO, "viewer", "thana 2"))
        .with_officer(officer(SHO_THREE, "station-admin", "thana 3"))
}

/// `seeded_repo` plus the given property rows.
pub fn repo_with(records: Vec<PropertyRecord>) -> Arc<InMemoryRepository> {
    let repo = seeded_officers_and_stations();
    Arc::new(records.into_iter().fold(repo, |repo, record| repo.with_property(record)))
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.jwt_secret = TEST_SECRET.to_string();
    config.public_base_url = BASE_URL.to_string();
    config
}

pub fn app_state(repo: Arc<InMemoryRepository>) -> AppState {
    app_state_with(repo, MockStorageService::new(), MockIdentityProvider::accepting(PASSWORD))
}

pub fn app_state_with(
    repo: Arc<InMemoryRepository>,
    storage: MockStorageService,
    identity: MockIdentityProvider,
) -> AppState {
    AppState {
        repo,
        storage: Arc::new(storage),
        identity: Arc::new(identity),
        config: test_config(),
    }
}

pub fn app(repo: Arc<InMemoryRepository>) -> Router {
    create_router(app_state(repo))
}

/// A valid credential for `email`, whatever the registry currently says.
pub fn token_for(email: &str, role: &str, station: &str) -> String {
    auth::issue_token(&officer(email, role, station), TEST_SECRET, 7).unwrap()
}

pub fn token_with_claims(claims: &Claims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn claims(email: &str, exp_offset_secs: i64) -> Claims {
    let now = Utc::now().timestamp();
    Claims {
        email: email.to_string(),
        role: "admin".to_string(),
        station: "thana 1".to_string(),
        iat: now,
        exp: now + exp_offset_secs,
    }
}

pub fn qr_url(key: &str) -> String {
    format!("{BASE_URL}/?qr={key}")
}

pub fn label_slot(key: &str, station: &str) -> PropertyRecord {
    PropertyRecord {
        qr_id: qr_url(key),
        station: station.to_string(),
        created_at: Utc::now(),
        ..PropertyRecord::default()
    }
}

pub fn complete_record(key: &str, property_id: &str, station: &str) -> PropertyRecord {
    PropertyRecord {
        property_id: Some(property_id.to_string()),
        submitted_at: Some(Utc::now()),
        current_status: Some("deposited".to_string()),
        ..label_slot(key, station)
    }
}

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("theme=dark; session_token={token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("session_token={token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string())
}

pub async fn body_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
