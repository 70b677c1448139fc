//! End-to-end tests for the account lifecycle: signup, verification,
//! login, logout revocation, and the password reset flow.

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};
use time::{Duration, OffsetDateTime};

use common::{login, signup, signup_and_login, test_server};
use gatherly::store::UserStore;

#[tokio::test]
async fn signup_stores_a_hashed_password_and_an_unverified_user() {
    let (server, store, mailer) = test_server();

    let response = server
        .post("/user/signup")
        .json(&json!({
            "username": "frida",
            "email": "Frida@Example.com",
            "password": "secret1",
            "fullName": "Frida Kahlo",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["user"]["username"], "frida");
    assert_eq!(body["user"]["email"], "frida@example.com");
    assert_eq!(body["user"]["verified"], false);
    // The public projection never carries secrets.
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("verificationToken").is_none());

    let user = store
        .find_by_email("frida@example.com")
        .await
        .unwrap()
        .expect("user should be stored");
    assert!(user.password_hash.starts_with("$argon2"));
    assert_ne!(user.password_hash, "secret1");
    assert!(!user.verified);
    assert!(user.verification_token.is_some());

    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "frida@example.com");
}

#[tokio::test]
async fn signup_rejects_duplicate_username_or_email() {
    let (server, _store, _mailer) = test_server();
    signup(&server, "frida", "frida@example.com", "secret1").await;

    let same_username = server
        .post("/user/signup")
        .json(&json!({
            "username": "frida",
            "email": "other@example.com",
            "password": "secret1",
            "fullName": "Other Person",
        }))
        .await;
    assert_eq!(same_username.status_code(), StatusCode::BAD_REQUEST);

    let same_email = server
        .post("/user/signup")
        .json(&json!({
            "username": "someone",
            "email": "frida@example.com",
            "password": "secret1",
            "fullName": "Someone Else",
        }))
        .await;
    assert_eq!(same_email.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = same_email.json();
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("already registered"));
}

#[tokio::test]
async fn signup_reports_invalid_fields_as_a_message() {
    let (server, _store, _mailer) = test_server();
    let response = server
        .post("/user/signup")
        .json(&json!({
            "username": "ab",
            "email": "nope",
            "password": "123",
            "fullName": "",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("Username"));
    assert!(message.contains("email"));
}

#[tokio::test]
async fn signup_still_succeeds_when_the_email_transport_fails() {
    let (server, _store, mailer) = test_server();
    mailer.fail.store(true, std::sync::atomic::Ordering::Relaxed);

    let response = server
        .post("/user/signup")
        .json(&json!({
            "username": "frida",
            "email": "frida@example.com",
            "password": "secret1",
            "fullName": "Frida Kahlo",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    assert!(mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn login_token_resolves_to_the_logged_in_user() {
    let (server, _store, _mailer) = test_server();
    signup(&server, "frida", "frida@example.com", "secret1").await;

    // Both the username and the email work as the identifier.
    let token = login(&server, "frida", "secret1").await;
    let profile = server
        .get("/user/profile")
        .authorization_bearer(&token)
        .await;
    assert_eq!(profile.status_code(), StatusCode::OK);
    let body: Value = profile.json();
    assert_eq!(body["user"]["username"], "frida");

    let token = login(&server, "frida@example.com", "secret1").await;
    let profile = server
        .get("/user/profile")
        .authorization_bearer(&token)
        .await;
    assert_eq!(profile.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn login_failures_keep_the_message_generic() {
    let (server, _store, _mailer) = test_server();
    signup(&server, "frida", "frida@example.com", "secret1").await;

    let unknown = server
        .post("/user/login")
        .json(&json!({ "usernameOrEmail": "nobody", "password": "secret1" }))
        .await;
    assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);
    let body: Value = unknown.json();
    assert_eq!(body["message"], "Invalid credentials");

    let wrong_password = server
        .post("/user/login")
        .json(&json!({ "usernameOrEmail": "frida", "password": "wrong-password" }))
        .await;
    assert_eq!(wrong_password.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = wrong_password.json();
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn logout_blacklists_the_session_token() {
    let (server, _store, _mailer) = test_server();
    let token = signup_and_login(&server, "frida").await;

    let logout = server
        .post("/user/logout")
        .authorization_bearer(&token)
        .await;
    assert_eq!(logout.status_code(), StatusCode::OK);

    // The token has not expired, but it no longer authenticates.
    let profile = server
        .get("/user/profile")
        .authorization_bearer(&token)
        .await;
    assert_eq!(profile.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = profile.json();
    assert!(body["message"].as_str().unwrap().contains("blacklisted"));
}

#[tokio::test]
async fn protected_routes_reject_missing_and_garbage_tokens() {
    let (server, _store, _mailer) = test_server();

    let missing = server.get("/user/profile").await;
    assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);

    let garbage = server
        .get("/user/profile")
        .authorization_bearer("not-a-real-token")
        .await;
    assert_eq!(garbage.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = garbage.json();
    assert!(body["message"].as_str().unwrap().contains("Invalid token"));
}

#[tokio::test]
async fn verify_email_consumes_the_stored_token() {
    let (server, store, _mailer) = test_server();
    signup(&server, "frida", "frida@example.com", "secret1").await;

    let user = store
        .find_by_email("frida@example.com")
        .await
        .unwrap()
        .unwrap();
    let token = user.verification_token.expect("token should be stored");

    let response = server.get(&format!("/user/verify-email/{token}")).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let user = store
        .find_by_email("frida@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(user.verified);
    assert!(user.verification_token.is_none());

    // The consumed token no longer matches anything on the record.
    let replay = server.get(&format!("/user/verify-email/{token}")).await;
    assert_eq!(replay.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stale_verification_token_is_rejected_after_a_resend() {
    let (server, store, _mailer) = test_server();
    signup(&server, "frida", "frida@example.com", "secret1").await;

    let stale = store
        .find_by_email("frida@example.com")
        .await
        .unwrap()
        .unwrap()
        .verification_token
        .unwrap();

    let resend = server
        .post("/user/resend-verification-email")
        .json(&json!({ "email": "frida@example.com" }))
        .await;
    assert_eq!(resend.status_code(), StatusCode::OK);

    // Well-formed and unexpired, but no longer the token on the record.
    let response = server.get(&format!("/user/verify-email/{stale}")).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid token");

    let fresh = store
        .find_by_email("frida@example.com")
        .await
        .unwrap()
        .unwrap()
        .verification_token
        .unwrap();
    let response = server.get(&format!("/user/verify-email/{fresh}")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn resend_fails_for_unknown_or_already_verified_users() {
    let (server, store, _mailer) = test_server();
    signup(&server, "frida", "frida@example.com", "secret1").await;

    let unknown = server
        .post("/user/resend-verification-email")
        .json(&json!({ "email": "nobody@example.com" }))
        .await;
    assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);

    let token = store
        .find_by_email("frida@example.com")
        .await
        .unwrap()
        .unwrap()
        .verification_token
        .unwrap();
    server.get(&format!("/user/verify-email/{token}")).await;

    let verified = server
        .post("/user/resend-verification-email")
        .json(&json!({ "email": "frida@example.com" }))
        .await;
    assert_eq!(verified.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = verified.json();
    assert!(body["message"].as_str().unwrap().contains("already verified"));
}

#[tokio::test]
async fn forgot_password_reveals_unknown_emails() {
    let (server, _store, _mailer) = test_server();

    let response = server
        .post("/user/forgot-password")
        .json(&json!({ "email": "nobody@example.com" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["message"], "User not found");

    let invalid = server
        .post("/user/forgot-password")
        .json(&json!({ "email": "not-an-email" }))
        .await;
    assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reset_password_round_trip() {
    let (server, store, mailer) = test_server();
    signup(&server, "frida", "frida@example.com", "secret1").await;

    let response = server
        .post("/user/forgot-password")
        .json(&json!({ "email": "frida@example.com" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(mailer.sent.lock().unwrap().len(), 2); // signup + reset

    let user = store
        .find_by_email("frida@example.com")
        .await
        .unwrap()
        .unwrap();
    let token = user.reset_token.expect("reset token should be stored");
    assert!(user.reset_token_expires_at.is_some());

    // Weak replacement is rejected before anything changes.
    let weak = server
        .post(&format!("/user/reset-password/{token}"))
        .json(&json!({ "password": "abc12" }))
        .await;
    assert_eq!(weak.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .post(&format!("/user/reset-password/{token}"))
        .json(&json!({ "password": "Abcde1" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    // Old password is gone, new one works, token is consumed.
    let old = server
        .post("/user/login")
        .json(&json!({ "usernameOrEmail": "frida", "password": "secret1" }))
        .await;
    assert_eq!(old.status_code(), StatusCode::UNAUTHORIZED);
    login(&server, "frida", "Abcde1").await;

    let user = store
        .find_by_email("frida@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(user.reset_token.is_none());
    assert!(user.reset_token_expires_at.is_none());

    let replay = server
        .post(&format!("/user/reset-password/{token}"))
        .json(&json!({ "password": "Fghij2" }))
        .await;
    assert_eq!(replay.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reset_fails_once_the_stored_expiry_has_passed() {
    let (server, store, _mailer) = test_server();
    signup(&server, "frida", "frida@example.com", "secret1").await;

    server
        .post("/user/forgot-password")
        .json(&json!({ "email": "frida@example.com" }))
        .await;

    let user = store
        .find_by_email("frida@example.com")
        .await
        .unwrap()
        .unwrap();
    let token = user.reset_token.unwrap();

    // Backdate the stored expiry; the token's own signature is still valid.
    store
        .set_reset_token(
            &user.id,
            &token,
            OffsetDateTime::now_utc() - Duration::minutes(5),
        )
        .await
        .unwrap();

    let response = server
        .post(&format!("/user/reset-password/{token}"))
        .json(&json!({ "password": "Abcde1" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn profile_can_be_updated_by_its_owner() {
    let (server, _store, _mailer) = test_server();
    let token = signup_and_login(&server, "frida").await;

    let response = server
        .put("/user/profile")
        .authorization_bearer(&token)
        .json(&json!({ "fullName": "Frida K.", "bio": "painter" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["user"]["fullName"], "Frida K.");
    assert_eq!(body["user"]["bio"], "painter");

    let short = server
        .put("/user/profile")
        .authorization_bearer(&token)
        .json(&json!({ "fullName": "ab" }))
        .await;
    assert_eq!(short.status_code(), StatusCode::BAD_REQUEST);
}
