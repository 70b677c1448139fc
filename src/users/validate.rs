use lazy_static::lazy_static;
use regex::Regex;

use super::dto::{LoginRequest, SignupRequest};
use crate::error::FieldError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn validate_signup(req: &SignupRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if req.username.trim().len() < 3 {
        errors.push(FieldError::new(
            "username",
            "Username must be at least 3 characters long",
        ));
    }
    if !is_valid_email(req.email.trim()) {
        errors.push(FieldError::new("email", "A valid email address is required"));
    }
    if req.password.trim().len() < 6 {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 6 characters long",
        ));
    }
    if req.full_name.trim().len() < 3 {
        errors.push(FieldError::new(
            "fullName",
            "Full name must be at least 3 characters long",
        ));
    }
    errors
}

pub fn validate_login(req: &LoginRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if req.username_or_email.trim().is_empty() {
        errors.push(FieldError::new(
            "usernameOrEmail",
            "Username or email is required",
        ));
    }
    if req.password.trim().is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }
    errors
}
