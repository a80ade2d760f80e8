//! Pre-rendering gate for page navigations.
//!
//! Every gated navigation is verified from scratch: the session credential is decoded and
//! its email re-checked against the officer registry. Verification fails closed. On the
//! landing route the requested URL is then looked up as a QR label; that lookup fails open.

use axum::{
    extract::{Request, State},
    http::Uri,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    AppState,
    auth::{self, AuthUser},
    repository::RepositoryState,
};

pub const LANDING_ROUTE: &str = "/";
pub const SIGN_IN_ROUTE: &str = "/signin";
pub const ADMIN_LANDING_ROUTE: &str = "/admin";

/// Path of the detail page for a completed record.
pub fn detail_route(property_id: &str) -> String {
    format!("/property/{property_id}")
}

/// Destination
///
/// The route classes the gate distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Landing,
    SignIn,
    Other,
}

impl Destination {
    pub fn classify(path: &str) -> Self {
        match path {
            LANDING_ROUTE => Destination::Landing,
            SIGN_IN_ROUTE => Destination::SignIn,
            _ => Destination::Other,
        }
    }
}

/// GateDecision
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Render the requested page; carries the identity when there is one.
    Proceed(Option<AuthUser>),
    Redirect(String),
}

/// Resolution
///
/// Outcome of looking up a landing URL in the property registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    RenderLanding,
    RedirectToRecord(String),
}

/// Rebuilds the full landing URL, the form in which it was printed on the QR label.
pub fn full_request_url(base_url: &str, uri: &Uri) -> String {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or(LANDING_ROUTE);
    format!("{}{}", base_url.trim_end_matches('/'), path_and_query)
}

/// resolve_record
///
/// The record resolver. Lookup errors, unknown URLs and labels whose form was never
/// completed all render the landing page; only a complete record redirects.
pub async fn resolve_record(repo: &RepositoryState, full_url: &str) -> Resolution {
    match repo.find_property_by_qr_id(full_url).await {
        Ok(Some(record)) => match record.completed_id() {
            Some(property_id) => Resolution::RedirectToRecord(property_id.to_string()),
            None => {
                tracing::debug!(qr_id = %full_url, "label found but record not yet submitted");
                Resolution::RenderLanding
            }
        },
        Ok(None) => Resolution::RenderLanding,
        Err(e) => {
            tracing::warn!(error = %e, "qr lookup failed, rendering landing page");
            Resolution::RenderLanding
        }
    }
}

/// evaluate
///
/// Decision for one navigation. Kept free of axum request types so the whole branch table
/// can be driven directly.
pub async fn evaluate(
    state: &AppState,
    destination: Destination,
    token: Option<&str>,
    full_url: &str,
) -> GateDecision {
    let identity = auth::verify_session(token, &state.repo, &state.config).await;

    match (identity, destination) {
        (None, Destination::SignIn) => GateDecision::Proceed(None),
        (None, _) => GateDecision::Redirect(SIGN_IN_ROUTE.to_string()),
        (Some(_), Destination::SignIn) => GateDecision::Redirect(ADMIN_LANDING_ROUTE.to_string()),
        (Some(user), Destination::Landing) => match resolve_record(&state.repo, full_url).await {
            Resolution::RedirectToRecord(property_id) => {
                GateDecision::Redirect(detail_route(&property_id))
            }
            Resolution::RenderLanding => GateDecision::Proceed(Some(user)),
        },
        (Some(user), Destination::Other) => GateDecision::Proceed(Some(user)),
    }
}

/// gate_middleware
///
/// Axum middleware applied to the page router. On `Proceed` the verified identity is stored
/// in the request extensions so handlers reuse it instead of verifying twice.
pub async fn gate_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let destination = Destination::classify(request.uri().path());
    let token = auth::session_token(request.headers(), &state.config.jwt_secret);
    let full_url = full_request_url(&state.config.public_base_url, request.uri());

    match evaluate(&state, destination, token.as_deref(), &full_url).await {
        GateDecision::Proceed(identity) => {
            if let Some(user) = identity {
                request.extensions_mut().insert(user);
            }
            next.run(request).await
        }
        GateDecision::Redirect(location) => {
            tracing::debug!(from = %request.uri(), to = %location, "gate redirect");
            Redirect::to(&location).into_response()
        }
    }
}
