use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider unreachable: {0}")]
    Transport(String),
    #[error("identity provider returned {0}")]
    Unexpected(u16),
}

/// IdentityProvider
///
/// Password verification for sign-in. Whether an officer may use the service at all is
/// decided afterwards by the officer registry, not by the provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(false)` for wrong credentials, `Err` when the provider could not answer.
    async fn verify_password(&self, email: &str, password: &str) -> Result<bool, IdentityError>;
}

pub type IdentityState = Arc<dyn IdentityProvider>;

/// SupabaseIdentityProvider
///
/// Uses the GoTrue password grant (`/auth/v1/token?grant_type=password`). The access token
/// Supabase returns is discarded; the service issues its own session credential.
#[derive(Clone)]
pub struct SupabaseIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseIdentityProvider {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    async fn verify_password(&self, email: &str, password: &str) -> Result<bool, IdentityError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);

        let response = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Ok(false),
            status => Err(IdentityError::Unexpected(status.as_u16())),
        }
    }
}

/// MockIdentityProvider
///
/// Accepts a single fixed password for every email, or fails every call.
#[derive(Clone)]
pub struct MockIdentityProvider {
    password: String,
    pub should_fail: bool,
}

impl MockIdentityProvider {
    pub fn accepting(password: &str) -> Self {
        Self {
            password: password.to_string(),
            should_fail: false,
        }
    }

    pub fn new_failing() -> Self {
        Self {
            password: String::new(),
            should_fail: true,
        }
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn verify_password(&self, _email: &str, password: &str) -> Result<bool, IdentityError> {
        if self.should_fail {
            return Err(IdentityError::Transport("mock provider offline".to_string()));
        }
        Ok(password == self.password)
    }
}
