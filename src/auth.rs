use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, HeaderValue, header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    models::{Officer, Role},
    repository::RepositoryState,
    scope::Scope,
};

/// Name of the cookie carrying the session credential.
pub const SESSION_COOKIE: &str = "session_token";

/// Claims
///
/// Payload of the session credential. `role` and `station` record what the registry said
/// at issue time; they are advisory only and are re-read from the registry on every request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub email: String,
    pub role: String,
    pub station: String,
    /// Issued At, seconds since the epoch.
    pub iat: i64,
    /// Expiration Time, seconds since the epoch. Enforced at verification.
    pub exp: i64,
}

/// AuthUser
///
/// The verified identity of a request: email from the credential, role and station from
/// the officer registry.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub station: String,
}

impl AuthUser {
    pub fn scope(&self) -> Scope {
        Scope::for_caller(self.role, &self.station)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_administrative()
    }

    /// Admins manage every station; station admins only their own.
    pub fn can_manage_station(&self, station: &str) -> bool {
        match self.role {
            Role::Admin => true,
            Role::StationAdmin => self.station == station,
            Role::Viewer => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token lifetime of {0} days is out of range")]
    LifetimeOutOfRange(i64),
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// issue_token
///
/// Mints a signed credential for an officer whose registry row has just been confirmed.
pub fn issue_token(officer: &Officer, secret: &str, ttl_days: i64) -> Result<String, TokenError> {
    let now = Utc::now();
    let expires_at = Duration::try_days(ttl_days)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or(TokenError::LifetimeOutOfRange(ttl_days))?;

    let claims = Claims {
        email: officer.email.clone(),
        role: officer.role.clone(),
        station: officer.station.clone(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// decode_token
///
/// Verifies signature and expiry. Bad signature, expired and malformed tokens all come back
/// as `None`; callers must not distinguish between them.
pub fn decode_token(token: &str, secret: &str) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;

    match decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!(reason = ?e.kind(), "session credential rejected");
            None
        }
    }
}

/// session_tokens
///
/// Every credential the request carries, in precedence order: each non-empty
/// `session_token` cookie in header order, then an `Authorization: Bearer` header.
pub fn session_tokens(headers: &HeaderMap) -> Vec<String> {
    let cookies = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string());

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    cookies.chain(bearer).collect()
}

/// session_token
///
/// The first candidate from [`session_tokens`] whose signature and expiry check out, so a
/// stale cookie cannot mask a valid one further down. `None` means there is no usable session.
pub fn session_token(headers: &HeaderMap, secret: &str) -> Option<String> {
    session_tokens(headers)
        .into_iter()
        .find(|token| decode_token(token, secret).is_some())
}

/// session_cookie
///
/// `Set-Cookie` value for a freshly issued credential: HttpOnly, site-wide, expiring with the token.
pub fn session_cookie(token: &str, config: &AppConfig) -> Option<HeaderValue> {
    let max_age = config.token_ttl_days.checked_mul(24 * 60 * 60)?;
    let secure = if config.env == Env::Production {
        "; Secure"
    } else {
        ""
    };
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age}{secure}"
    ))
    .ok()
}

/// `Set-Cookie` value that removes the session.
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("session_token=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

/// verify_session
///
/// The token verifier. Returns the registry-backed identity or `None`; every failure mode
/// (missing token, bad signature, expired, unknown officer, failed lookup, unknown role)
/// collapses to `None`.
pub async fn verify_session(
    token: Option<&str>,
    repo: &RepositoryState,
    config: &AppConfig,
) -> Option<AuthUser> {
    let claims = decode_token(token?, &config.jwt_secret)?;

    let officer = match repo.get_officer(&claims.email).await {
        Ok(Some(officer)) => officer,
        Ok(None) => {
            tracing::debug!(email = %claims.email, "credential holder not in officer registry");
            return None;
        }
        Err(e) => {
            tracing::error!(error = %e, "officer registry lookup failed");
            return None;
        }
    };

    let role = match officer.role.parse::<Role>() {
        Ok(role) => role,
        Err(unknown) => {
            tracing::error!(email = %officer.email, role = %unknown.0, "officer has unknown role");
            return None;
        }
    };

    Some(AuthUser {
        email: officer.email,
        name: officer.name,
        role,
        station: officer.station,
    })
}

/// AuthUser Extractor
///
/// Authenticates API requests. If the page gate already verified this request it reuses
/// that identity from the request extensions; otherwise it runs the verifier itself.
/// Rejects with `401` and no detail.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        let token = session_token(&parts.headers, &config.jwt_secret);

        verify_session(token.as_deref(), &repo, &config)
            .await
            .ok_or(ApiError::Unauthorized)
    }
}
