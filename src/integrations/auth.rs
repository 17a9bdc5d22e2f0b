//! Account service client.
//!
//! Issues and resolves bearer credentials. Login and signup are the only
//! calls made without a credential.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::api::{self, ApiError, ApiResult};
use crate::security::Credential;

/// Account operations the application depends on.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Exchange username and password for a bearer credential.
    async fn login(&self, username: &str, password: &str) -> ApiResult<Credential>;

    /// Create an account. Does not sign in.
    async fn signup(&self, username: &str, email: &str, password: &str) -> ApiResult<()>;

    /// Resolve the username behind `credential`.
    async fn current_user(&self, credential: &Credential) -> ApiResult<String>;

    /// Check that the service answers.
    async fn health(&self) -> ApiResult<()>;
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignupRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct MeResponse {
    username: String,
}

/// HTTP client for the account service.
#[derive(Debug, Clone)]
pub struct AuthClient {
    base_url: String,
    client: reqwest::Client,
}

impl AuthClient {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        Ok(Self { base_url: base_url.into(), client: api::build_client(timeout)? })
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        api::endpoint(&self.base_url, path)
    }
}

#[async_trait]
impl AuthService for AuthClient {
    async fn login(&self, username: &str, password: &str) -> ApiResult<Credential> {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        // A 401 here means bad credentials, not an expired session.
        let body: TokenResponse = api::decode_json(response, false).await?;
        Credential::new(body.token)
            .ok_or_else(|| ApiError::Decode("login response carried an empty token".to_string()))
    }

    async fn signup(&self, username: &str, email: &str, password: &str) -> ApiResult<()> {
        let response = self
            .client
            .post(self.url("/api/auth/signup"))
            .json(&SignupRequest { username, email, password })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api::parse_error(response, false).await);
        }
        Ok(())
    }

    async fn current_user(&self, credential: &Credential) -> ApiResult<String> {
        let request = self.client.get(self.url("/api/auth/me"));
        let response = api::authorize(request, Some(credential)).send().await?;
        let body: MeResponse = api::decode_json(response, true).await?;
        Ok(body.username)
    }

    async fn health(&self) -> ApiResult<()> {
        let response = self.client.get(self.url("/health")).send().await?;
        if !response.status().is_success() {
            return Err(api::parse_error(response, false).await);
        }
        Ok(())
    }
}
