//! Shared HTTP plumbing for the collaborating services.
//!
//! Both services answer errors with a JSON body carrying an `error` (or
//! `message`) field; generation endpoints additionally wrap results in a
//! `{success, data, error}` envelope.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::security::Credential;

/// Result type for collaborator calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error types for collaborator calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication rejected")]
    Unauthorized,

    #[error("{} (status: {status})", .message.as_deref().unwrap_or("Request failed"))]
    Api { status: u16, message: Option<String> },

    #[error("{}", .message.as_deref().unwrap_or("Request was not successful"))]
    Rejected { message: Option<String> },

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// The reason reported by the collaborator, if it gave one.
    pub fn reported_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } | Self::Rejected { message } => {
                message.as_deref().filter(|m| !m.trim().is_empty())
            }
            Self::Http(_) | Self::Unauthorized | Self::Decode(_) => None,
        }
    }

    /// Whether the credential was rejected.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// `{success, data, error}` response wrapper.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// Unwrap the payload or report the failure.
    pub fn into_result(self) -> ApiResult<T> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(ApiError::Decode("success envelope without data".to_string())),
            (false, _) => Err(ApiError::Rejected { message: self.error }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    #[serde(alias = "msg")]
    message: Option<String>,
}

/// Build the shared HTTP client.
pub fn build_client(timeout: Duration) -> ApiResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("repomate/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Join a base URL and an absolute path.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Attach the bearer credential when there is one.
pub fn authorize(
    request: reqwest::RequestBuilder,
    credential: Option<&Credential>,
) -> reqwest::RequestBuilder {
    match credential {
        Some(credential) => request.header(reqwest::header::AUTHORIZATION, credential.bearer()),
        None => request,
    }
}

/// Parse an error response.
///
/// A 401 becomes [`ApiError::Unauthorized`] only on authenticated calls; on
/// login it is an ordinary "bad credentials" answer.
pub async fn parse_error(response: reqwest::Response, authenticated: bool) -> ApiError {
    let status = response.status().as_u16();
    if authenticated && status == 401 {
        return ApiError::Unauthorized;
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error.or(body.message))
        .filter(|m| !m.trim().is_empty());
    ApiError::Api { status, message }
}

/// Decode a plain JSON success body, or parse the error.
pub async fn decode_json<T: DeserializeOwned>(
    response: reqwest::Response,
    authenticated: bool,
) -> ApiResult<T> {
    if !response.status().is_success() {
        return Err(parse_error(response, authenticated).await);
    }
    response.json::<T>().await.map_err(|e| ApiError::Decode(e.to_string()))
}

/// Decode an enveloped body.
///
/// Generation endpoints report failures inside the envelope with an error
/// status, so the body is read regardless of status.
pub async fn decode_envelope<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
    let status = response.status();
    if status.as_u16() == 401 {
        return Err(ApiError::Unauthorized);
    }

    match response.json::<Envelope<T>>().await {
        Ok(envelope) => envelope.into_result(),
        Err(e) if status.is_success() => Err(ApiError::Decode(e.to_string())),
        Err(_) => Err(ApiError::Api { status: status.as_u16(), message: None }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_success() {
        let envelope: Envelope<serde_json::Value> = serde_json::from_str(
            r##"{"success": true, "data": {"readme_content": "# Title"}}"##,
        )
        .unwrap();
        let data = envelope.into_result().unwrap();
        assert_eq!(data["readme_content"], "# Title");
    }

    #[test]
    fn test_envelope_failure_carries_reason() {
        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"success": false, "error": "GitHub URL is required"}"#)
                .unwrap();
        let err = envelope.into_result().unwrap_err();
        assert_eq!(err.reported_message(), Some("GitHub URL is required"));
        assert!(!err.is_auth_rejection());
    }

    #[test]
    fn test_envelope_failure_without_reason() {
        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert_eq!(envelope.into_result().unwrap_err().reported_message(), None);
    }

    #[test]
    fn test_error_body_field_names() {
        let body: ErrorBody = serde_json::from_str(r#"{"msg": "Token invalid"}"#).unwrap();
        assert_eq!(body.message.as_deref(), Some("Token invalid"));
        let body: ErrorBody =
            serde_json::from_str(r#"{"error": "Invalid username or password"}"#).unwrap();
        assert_eq!(body.error.as_deref(), Some("Invalid username or password"));
    }

    #[test]
    fn test_blank_messages_are_not_reported() {
        let err = ApiError::Api { status: 500, message: Some("  ".into()) };
        assert_eq!(err.reported_message(), None);
        assert_eq!(ApiError::Unauthorized.reported_message(), None);
    }

    #[test]
    fn test_endpoint_joining() {
        assert_eq!(endpoint("http://localhost:5001/", "/ask"), "http://localhost:5001/ask");
        assert_eq!(
            endpoint("http://localhost:5000", "api/auth/me"),
            "http://localhost:5000/api/auth/me"
        );
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Api { status: 404, message: Some("No branches found".into()) };
        assert_eq!(err.to_string(), "No branches found (status: 404)");
        let err = ApiError::Rejected { message: None };
        assert_eq!(err.to_string(), "Request was not successful");
    }
}
