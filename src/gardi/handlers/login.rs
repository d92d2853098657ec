//! Login: verify credentials against the user store and issue a token.

use crate::gardi::credentials::{verify_password, AccessClaims, TokenSigner};
use crate::gardi::errors::AuthError;
use crate::gardi::store::{check_role, UserRole, UserStore};
use axum::{extract::Extension, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Roles provisioned for this system; a user without one cannot log in.
const SYSTEM_ROLES: [UserRole; 4] = [
    UserRole::Superadmin,
    UserRole::Admin,
    UserRole::Manager,
    UserRole::Seller,
];

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginUser {
    pub id: Uuid,
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: LoginUser,
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authentication successful", body = LoginResponse, content_type = "application/json"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Access denied. Invalid user role"),
        (status = 429, description = "Too many login attempts"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    Extension(signer): Extension<Arc<TokenSigner>>,
    Extension(users): Extension<Arc<dyn UserStore>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::InvalidCredentials);
    };

    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AuthError::InvalidCredentials);
    }

    // Unknown user and wrong password take the same path so the response
    // cannot be used to enumerate accounts.
    let Some(user) = users.find_by_email(&request.email) else {
        debug!("login attempt for unknown user");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(&request.password, &user.password_hash)? {
        debug!("password mismatch");
        return Err(AuthError::InvalidCredentials);
    }

    check_role(user.role, &SYSTEM_ROLES, "log in")?;

    let mut claims = AccessClaims::new(user.id.to_string());
    if let Some(role) = user.role {
        claims = claims.with_role(role);
    }

    let access_token = signer.issue_default(claims)?;

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: signer.default_ttl().as_secs(),
        user: LoginUser {
            id: user.id,
            email: user.email,
        },
    }))
}
