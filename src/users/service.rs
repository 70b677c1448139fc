use axum::extract::FromRef;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use super::dto::{
    ForgotPasswordRequest, LoginRequest, PublicUser, ResendVerificationRequest,
    ResetPasswordRequest, SignupRequest, UpdateProfileRequest,
};
use super::model::User;
use super::validate;
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::auth::token::{TokenKeys, TokenPurpose};
use crate::error::{ApiError, FieldError};
use crate::mailer::{password_reset_email, verification_email};
use crate::state::AppState;
use crate::store::{ProfilePatch, StoreError};
use crate::id;

/// User-facing endpoints surface validation failures as one joined
/// message; only the event endpoints use the errors-array shape.
fn validation_message(errors: Vec<FieldError>) -> ApiError {
    ApiError::BadRequest(
        errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join(", "),
    )
}

pub async fn signup(state: &AppState, mut req: SignupRequest) -> Result<PublicUser, ApiError> {
    let errors = validate::validate_signup(&req);
    if !errors.is_empty() {
        return Err(validation_message(errors));
    }
    req.username = req.username.trim().to_string();
    req.email = req.email.trim().to_lowercase();

    let taken = state
        .users
        .find_by_username_or_email(&req.username)
        .await?
        .is_some()
        || state.users.find_by_email(&req.email).await?.is_some();
    if taken {
        return Err(ApiError::bad_request("Username or email is already registered"));
    }

    let now = OffsetDateTime::now_utc();
    let user = User {
        id: id::new_object_id(),
        username: req.username,
        email: req.email,
        password_hash: hash_password(&req.password)?,
        full_name: req.full_name.trim().to_string(),
        bio: None,
        profile_picture: None,
        verified: false,
        verification_token: None,
        reset_token: None,
        reset_token_expires_at: None,
        created_at: now,
        updated_at: now,
    };
    let user = match state.users.insert(user).await {
        Ok(u) => u,
        Err(StoreError::Duplicate) => {
            return Err(ApiError::bad_request("Username or email is already registered"))
        }
        Err(e) => return Err(e.into()),
    };

    let keys = TokenKeys::from_ref(state);
    let token = keys.issue(&user.id, TokenPurpose::VerifyEmail)?;
    state.users.set_verification_token(&user.id, &token).await?;

    let (subject, html) = verification_email(&state.config.public_url, &token);
    if let Err(e) = state.mailer.send(&user.email, &subject, &html).await {
        warn!(error = %e, email = %user.email, "verification email failed to send");
    }

    info!(user_id = %user.id, username = %user.username, "user signed up");
    Ok(user.public())
}

pub async fn login(state: &AppState, req: LoginRequest) -> Result<(String, PublicUser), ApiError> {
    let errors = validate::validate_login(&req);
    if !errors.is_empty() {
        return Err(validation_message(errors));
    }
    let handle = req.username_or_email.trim();

    // Unknown identifier and wrong password share one message so the
    // response body never confirms an account exists.
    let user = state
        .users
        .find_by_username_or_email(handle)
        .await?
        .ok_or_else(|| ApiError::not_found("Invalid credentials"))?;

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = TokenKeys::from_ref(state).issue(&user.id, TokenPurpose::Session)?;
    info!(user_id = %user.id, "user logged in");
    Ok((token, user.public()))
}

pub async fn logout(state: &AppState, token: &str) -> Result<(), ApiError> {
    // A duplicate revoke is fine; a failed write is not.
    state.revoked.revoke(token).await?;
    info!("session token revoked");
    Ok(())
}

pub async fn verify_email(state: &AppState, token: &str) -> Result<(), ApiError> {
    let keys = TokenKeys::from_ref(state);
    let claims = keys
        .verify(token)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    if claims.purpose != TokenPurpose::VerifyEmail {
        return Err(ApiError::bad_request("Invalid token"));
    }

    let user = state
        .users
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid token"))?;

    // The token must be the one currently on the record; a rotated or
    // already-consumed token no longer verifies anyone.
    if user.verification_token.as_deref() != Some(token) {
        return Err(ApiError::bad_request("Invalid token"));
    }

    state.users.mark_verified(&user.id).await?;
    info!(user_id = %user.id, "email verified");
    Ok(())
}

pub async fn forgot_password(
    state: &AppState,
    req: ForgotPasswordRequest,
) -> Result<(), ApiError> {
    let email = req.email.trim().to_lowercase();
    if !validate::is_valid_email(&email) {
        return Err(ApiError::bad_request("A valid email address is required"));
    }

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let keys = TokenKeys::from_ref(state);
    let token = keys.issue(&user.id, TokenPurpose::ResetPassword)?;
    let expires_at =
        OffsetDateTime::now_utc() + Duration::minutes(state.config.jwt.email_token_ttl_minutes);
    state
        .users
        .set_reset_token(&user.id, &token, expires_at)
        .await?;

    let (subject, html) = password_reset_email(&state.config.public_url, &token);
    if let Err(e) = state.mailer.send(&user.email, &subject, &html).await {
        warn!(error = %e, email = %user.email, "password reset email failed to send");
    }

    info!(user_id = %user.id, "password reset requested");
    Ok(())
}

pub async fn reset_password(
    state: &AppState,
    token: &str,
    req: ResetPasswordRequest,
) -> Result<(), ApiError> {
    let errors = validate_password_strength(&req.password);
    if !errors.is_empty() {
        return Err(validation_message(errors));
    }

    let keys = TokenKeys::from_ref(state);
    let claims = keys
        .verify(token)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    if claims.purpose != TokenPurpose::ResetPassword {
        return Err(ApiError::bad_request("Invalid token"));
    }

    let user = state
        .users
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid token"))?;

    if user.reset_token.as_deref() != Some(token) {
        return Err(ApiError::bad_request("Invalid token"));
    }
    // The stored expiry governs even while the signature is still valid.
    match user.reset_token_expires_at {
        Some(expires_at) if expires_at > OffsetDateTime::now_utc() => {}
        _ => {
            state.users.clear_reset_token(&user.id).await?;
            return Err(ApiError::bad_request("Invalid token"));
        }
    }

    let hash = hash_password(&req.password)?;
    state.users.set_password_hash(&user.id, &hash).await?;
    state.users.clear_reset_token(&user.id).await?;

    info!(user_id = %user.id, "password reset");
    Ok(())
}

pub async fn resend_verification_email(
    state: &AppState,
    req: ResendVerificationRequest,
) -> Result<(), ApiError> {
    let email = req.email.trim().to_lowercase();
    if !validate::is_valid_email(&email) {
        return Err(ApiError::bad_request("A valid email address is required"));
    }

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if user.verified {
        return Err(ApiError::bad_request("Email is already verified"));
    }

    let keys = TokenKeys::from_ref(state);
    let token = keys.issue(&user.id, TokenPurpose::VerifyEmail)?;
    state.users.set_verification_token(&user.id, &token).await?;

    let (subject, html) = verification_email(&state.config.public_url, &token);
    if let Err(e) = state.mailer.send(&user.email, &subject, &html).await {
        warn!(error = %e, email = %user.email, "verification email failed to send");
    }

    info!(user_id = %user.id, "verification email resent");
    Ok(())
}

pub async fn profile(state: &AppState, user_id: &str) -> Result<PublicUser, ApiError> {
    state
        .users
        .find_by_id(user_id)
        .await?
        .map(|u| u.public())
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub async fn update_profile(
    state: &AppState,
    user_id: &str,
    req: UpdateProfileRequest,
) -> Result<PublicUser, ApiError> {
    let mut patch = ProfilePatch::default();
    if let Some(full_name) = req.full_name {
        let full_name = full_name.trim().to_string();
        if full_name.len() < 3 {
            return Err(ApiError::bad_request(
                "Full name must be at least 3 characters long",
            ));
        }
        patch.full_name = Some(full_name);
    }
    patch.bio = req.bio.map(|b| b.trim().to_string());
    patch.profile_picture = req.profile_picture.map(|p| p.trim().to_string());

    let user = state
        .users
        .update_profile(user_id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(user_id = %user.id, "profile updated");
    Ok(user.public())
}
