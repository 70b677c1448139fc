use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod model;
pub mod service;
pub mod validate;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/signup", post(handlers::signup))
        .route("/user/login", post(handlers::login))
        .route("/user/logout", post(handlers::logout))
        .route("/user/verify-email/:token", get(handlers::verify_email))
        .route("/user/forgot-password", post(handlers::forgot_password))
        .route("/user/reset-password/:token", post(handlers::reset_password))
        .route(
            "/user/resend-verification-email",
            post(handlers::resend_verification_email),
        )
        .route(
            "/user/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
}
