//! Error taxonomy shared by the admission and credential paths.
//!
//! Authentication failures are indistinguishable at the HTTP boundary: wrong
//! password, unknown user, and bad or expired tokens all produce the same
//! 401 body so responses cannot be used to enumerate accounts.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::error;

const CREDENTIALS_MESSAGE: &str = "Could not validate credentials";
const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Recoverable by the caller after backing off; never retried here.
    #[error("Rate limit exceeded. Maximum {max_requests} requests per {window_seconds} seconds.")]
    RateLimitExceeded { max_requests: u32, window_seconds: u64 },

    /// Unknown subject and wrong password collapse into this one variant.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Malformed, unsigned, or wrong-signature token.
    #[error("Token invalid")]
    TokenInvalid,

    /// Past expiry; the caller must re-authenticate.
    #[error("Token expired")]
    TokenExpired,

    #[error("Insufficient permissions to {0}")]
    InsufficientRole(String),

    /// Fatal at startup, not per-request.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidCredentials | Self::TokenInvalid | Self::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            Self::InsufficientRole(_) => StatusCode::FORBIDDEN,
            Self::Configuration(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the caller. One uniform string for every credential
    /// failure; internal detail never leaves the process.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidCredentials | Self::TokenInvalid | Self::TokenExpired => {
                CREDENTIALS_MESSAGE.to_string()
            }
            Self::Configuration(_) | Self::Internal(_) => INTERNAL_MESSAGE.to_string(),
            Self::RateLimitExceeded { .. } | Self::InsufficientRole(_) => self.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{self}");
        }

        let body = Json(json!({
            "error": {
                "status_code": status.as_u16(),
                "message": self.public_message(),
                "type": "error",
            }
        }));

        let mut response = (status, body).into_response();

        match self {
            Self::RateLimitExceeded { window_seconds, .. } => {
                if let Ok(value) = HeaderValue::from_str(&window_seconds.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
            }
            Self::InvalidCredentials | Self::TokenInvalid | Self::TokenExpired => {
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Bearer"),
                );
            }
            _ => {}
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_of(error: AuthError) -> Value {
        let response = error.into_response();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("body is JSON")
    }

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            AuthError::RateLimitExceeded {
                max_requests: 5,
                window_seconds: 300
            }
            .status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::TokenInvalid.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::InsufficientRole("log in".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::Configuration("no secret".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::Internal(anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn credential_failures_share_one_body() {
        let invalid = body_of(AuthError::InvalidCredentials).await;
        let malformed = body_of(AuthError::TokenInvalid).await;
        let expired = body_of(AuthError::TokenExpired).await;

        assert_eq!(invalid, malformed);
        assert_eq!(malformed, expired);
        assert_eq!(invalid["error"]["message"], CREDENTIALS_MESSAGE);
    }

    #[tokio::test]
    async fn rate_limit_response_reports_policy_and_retry_after() {
        let error = AuthError::RateLimitExceeded {
            max_requests: 5,
            window_seconds: 300,
        };
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER),
            Some(&HeaderValue::from_static("300"))
        );

        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        let body: Value = serde_json::from_slice(&bytes).expect("body is JSON");
        assert_eq!(
            body["error"]["message"],
            "Rate limit exceeded. Maximum 5 requests per 300 seconds."
        );
    }

    #[tokio::test]
    async fn unauthorized_carries_www_authenticate() {
        let response = AuthError::TokenExpired.into_response();
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE),
            Some(&HeaderValue::from_static("Bearer"))
        );
    }

    #[tokio::test]
    async fn internal_detail_never_leaves_the_process() {
        let body = body_of(AuthError::Internal(anyhow!("bcrypt exploded"))).await;
        assert_eq!(body["error"]["message"], INTERNAL_MESSAGE);
    }
}
