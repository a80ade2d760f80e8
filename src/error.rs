use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::scope::SearchError;

/// RepositoryError
///
/// Failure of the data service itself. "Row not found" is never an error; it is `Ok(None)`.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("data service unavailable")]
    Unavailable,
}

/// ApiError
///
/// Outcome of a failed API call. Messages are deliberately generic: authentication
/// failures never say which check failed and query failures never leak driver detail.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Conflict(&'static str),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("query failed")]
    QueryFailed,
    #[error("upstream service failed")]
    Upstream,
    #[error("internal error")]
    Internal,
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        tracing::error!(error = %err, "data service query failed");
        ApiError::QueryFailed
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use ApiError::*;
        let status_code = match self {
            Unauthorized => StatusCode::UNAUTHORIZED,
            Forbidden => StatusCode::FORBIDDEN,
            NotFound => StatusCode::NOT_FOUND,
            Conflict(_) => StatusCode::CONFLICT,
            BadRequest(_) => StatusCode::BAD_REQUEST,
            QueryFailed => StatusCode::INTERNAL_SERVER_ERROR,
            Upstream => StatusCode::BAD_GATEWAY,
            Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status_code, self.to_string()).into_response()
    }
}
