//! HTTP-level checks of the auth contract

use ayur_auth_mock::{Config, MockServer};
use reqwest::StatusCode;
use serde_json::{Value, json};

async fn server() -> MockServer {
    MockServer::start(Config::default().with_seed_admin("admin@ayur.test", "admin123"))
        .await
        .unwrap()
}

fn kamal() -> Value {
    json!({
        "name": "Kamal",
        "email": "kamal@example.com",
        "password": "secret1",
        "phone": "0771234567",
        "address": "12 Temple Rd",
        "city": "Kandy",
        "role": "customer"
    })
}

#[tokio::test]
async fn test_register_login_me() {
    let server = server().await;
    let http = reqwest::Client::new();
    let base = server.api_url();

    let resp = http
        .post(format!("{base}/auth/register"))
        .json(&kamal())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["role"], "customer");
    assert_eq!(body["user"]["city"], "Kandy");

    let resp = http
        .post(format!("{base}/auth/login"))
        .json(&json!({ "email": "kamal@example.com", "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let resp = http
        .get(format!("{base}/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["email"], "kamal@example.com");
}

#[tokio::test]
async fn test_error_bodies() {
    let server = server().await;
    let http = reqwest::Client::new();
    let base = server.api_url();

    let resp = http
        .post(format!("{base}/auth/login"))
        .json(&json!({ "email": "ghost@example.com", "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Invalid credentials");

    let resp = http.get(format!("{base}/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Not authorized, no token");

    let resp = http
        .get(format!("{base}/auth/me"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Not authorized, token failed");

    http.post(format!("{base}/auth/register"))
        .json(&kamal())
        .send()
        .await
        .unwrap();
    let resp = http
        .post(format!("{base}/auth/register"))
        .json(&kamal())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "User already exists");

    let resp = http
        .post(format!("{base}/auth/register"))
        .json(&json!({ "email": "x@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_cannot_self_register() {
    let server = server().await;
    let mut admin = kamal();
    admin["role"] = json!("admin");

    let resp = reqwest::Client::new()
        .post(format!("{}/auth/register", server.api_url()))
        .json(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_revoked_token_is_rejected() {
    let server = server().await;
    let http = reqwest::Client::new();
    let base = server.api_url();

    let resp = http
        .post(format!("{base}/auth/login"))
        .json(&json!({ "email": "admin@ayur.test", "password": "admin123" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["role"], "admin");
    let token = body["token"].as_str().unwrap().to_string();

    server.state.revoke(&token).await.unwrap();
    let resp = http
        .get(format!("{base}/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_and_password() {
    let server = server().await;
    let http = reqwest::Client::new();
    let base = server.api_url();

    let body: Value = http
        .post(format!("{base}/auth/register"))
        .json(&kamal())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let resp = http
        .put(format!("{base}/profile"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Kamal Perera", "zipcode": "20000" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Kamal Perera");
    assert_eq!(body["data"]["zipcode"], "20000");

    let resp = http
        .put(format!("{base}/profile/password"))
        .bearer_auth(&token)
        .json(&json!({ "currentPassword": "wrong", "newPassword": "newpass1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Current password incorrect");

    let resp = http
        .put(format!("{base}/profile/password"))
        .bearer_auth(&token)
        .json(&json!({ "currentPassword": "secret1", "newPassword": "newpass1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
}
