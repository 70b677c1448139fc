use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::{
    auth::token::{TokenKeys, TokenPurpose},
    error::ApiError,
    state::AppState,
};

/// Identity resolved from the `Authorization: Bearer <token>` header.
///
/// The raw token is kept alongside the user id so logout can revoke
/// exactly the credential that authenticated the request.
pub struct AuthUser {
    pub user_id: String,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header"))?;

        // Blacklist first: a logged-out token stays rejected as revoked
        // for as long as its signature would otherwise be accepted.
        if state.revoked.is_revoked(token).await? {
            warn!("rejected blacklisted token");
            return Err(ApiError::unauthorized("Token is blacklisted"));
        }

        let keys = TokenKeys::from_ref(state);
        let claims = keys
            .verify(token)
            .map_err(|e| ApiError::unauthorized(e.to_string()))?;

        if claims.purpose != TokenPurpose::Session {
            warn!(purpose = ?claims.purpose, "non-session token on protected route");
            return Err(ApiError::unauthorized("Invalid token"));
        }

        Ok(AuthUser {
            user_id: claims.sub,
            token: token.to_string(),
        })
    }
}
