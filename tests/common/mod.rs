use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use gatherly::app::build_app;
use gatherly::mailer::MockMailer;
use gatherly::state::AppState;
use gatherly::store::memory::MemoryStore;

pub fn test_server() -> (TestServer, Arc<MemoryStore>, Arc<MockMailer>) {
    let (state, store, mailer) = AppState::in_memory();
    let server = TestServer::new(build_app(state)).expect("test server should build");
    (server, store, mailer)
}

pub async fn signup(server: &TestServer, username: &str, email: &str, password: &str) {
    let response = server
        .post("/user/signup")
        .json(&json!({
            "username": username,
            "email": email,
            "password": password,
            "fullName": "Test Person",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
}

pub async fn login(server: &TestServer, handle: &str, password: &str) -> String {
    let response = server
        .post("/user/login")
        .json(&json!({
            "usernameOrEmail": handle,
            "password": password,
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    body["token"].as_str().expect("login token").to_string()
}

pub async fn signup_and_login(server: &TestServer, username: &str) -> String {
    let email = format!("{username}@example.com");
    signup(server, username, &email, "secret1").await;
    login(server, username, "secret1").await
}
