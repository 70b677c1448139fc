use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;

use super::dto::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse,
    ResendVerificationRequest, ResetPasswordRequest, SignupRequest, UpdateProfileRequest,
    UserResponse,
};
use super::service;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = service::signup(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "User registered successfully. Please verify your email.".into(),
            user,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (token, user) = service::login(&state, payload).await?;
    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        token,
        user,
    }))
}

#[instrument(skip(state, auth))]
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    service::logout(&state, &auth.token).await?;
    Ok(Json(MessageResponse {
        message: "Logged out successfully".into(),
    }))
}

#[instrument(skip(state, token))]
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    service::verify_email(&state, &token).await?;
    Ok(Json(MessageResponse {
        message: "Email verified successfully".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    service::forgot_password(&state, payload).await?;
    Ok(Json(MessageResponse {
        message: "Password reset email sent".into(),
    }))
}

#[instrument(skip(state, token, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    service::reset_password(&state, &token, payload).await?;
    Ok(Json(MessageResponse {
        message: "Password reset successfully".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn resend_verification_email(
    State(state): State<AppState>,
    Json(payload): Json<ResendVerificationRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    service::resend_verification_email(&state, payload).await?;
    Ok(Json(MessageResponse {
        message: "Verification email sent".into(),
    }))
}

#[instrument(skip(state, auth))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = service::profile(&state, &auth.user_id).await?;
    Ok(Json(UserResponse {
        message: "Profile fetched successfully".into(),
        user,
    }))
}

#[instrument(skip(state, auth, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = service::update_profile(&state, &auth.user_id, payload).await?;
    Ok(Json(UserResponse {
        message: "Profile updated successfully".into(),
        user,
    }))
}
