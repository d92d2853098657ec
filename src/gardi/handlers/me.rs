//! Current-user endpoint and the bearer-token extractor.

use crate::gardi::credentials::{AccessClaims, TokenSigner};
use crate::gardi::errors::AuthError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

/// Claims of the authenticated caller, taken from the `Authorization`
/// header. Only the token is inspected; fetching the full user record from
/// storage is the surrounding system's concern.
pub struct CurrentUser(pub AccessClaims);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let signer = parts
            .extensions
            .get::<Arc<TokenSigner>>()
            .cloned()
            .ok_or_else(|| {
                AuthError::Internal(anyhow::anyhow!(
                    "token signer missing from request extensions"
                ))
            })?;

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AuthError::TokenInvalid)?;

        Ok(Self(signer.validate(token)?))
    }
}

#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current user's subject identifier", content_type = "application/json"),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn me(CurrentUser(claims): CurrentUser) -> impl IntoResponse {
    Json(json!({ "user": { "id": claims.sub } }))
}
