mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{TestApp, PASSWORD};
use eventhub::domain::models::user::Role;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Reads the raw token stored in the newest job of the given type.
async fn latest_token(app: &TestApp, job_type: &str) -> String {
    let payload: String = sqlx::query_scalar(
        "SELECT payload FROM jobs WHERE job_type = ? ORDER BY created_at DESC LIMIT 1"
    )
        .bind(job_type)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    let payload: Value = serde_json::from_str(&payload).unwrap();
    payload["token"].as_str().expect("job carries no token").to_string()
}

async fn login_status(app: &TestApp, email: &str, password: &str) -> StatusCode {
    let (status, _) = app.call("POST", "/api/v1/auth/login", None, Some(json!({
        "email": email,
        "password": password
    }))).await;
    status
}

#[tokio::test]
async fn test_signup_verify_and_login() {
    let app = TestApp::new().await;

    let (status, body) = app.call("POST", "/api/v1/auth/signup", None, Some(json!({
        "email": "  Ada@Uni.test ",
        "password": "analytical-engine",
        "name": "Ada Lovelace"
    }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "ada@uni.test");
    assert_eq!(body["role"], "USER");
    assert_eq!(body["email_verified"], false);
    assert!(body.get("password_hash").is_none());

    // Same address, different case
    let (status, _) = app.call("POST", "/api/v1/auth/signup", None, Some(json!({
        "email": "ADA@uni.test",
        "password": "analytical-engine",
        "name": "Ada Again"
    }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    assert_eq!(login_status(&app, "ada@uni.test", "analytical-engine").await, StatusCode::FORBIDDEN);

    let token = latest_token(&app, "VERIFY_EMAIL").await;
    let (status, body) = app.call("POST", "/api/v1/auth/verify-email", None, Some(json!({ "token": token }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email_verified"], true);

    // Tokens are single use
    let (status, _) = app.call("POST", "/api/v1/auth/verify-email", None, Some(json!({ "token": token }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(login_status(&app, "ada@uni.test", "wrong-password").await, StatusCode::UNAUTHORIZED);
    assert_eq!(login_status(&app, "nobody@uni.test", "analytical-engine").await, StatusCode::UNAUTHORIZED);

    let auth = app.login("ada@uni.test", "analytical-engine").await;
    let (status, me) = app.call("GET", "/api/v1/me", Some(&auth), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Ada Lovelace");
}

#[tokio::test]
async fn test_signup_validation() {
    let app = TestApp::new().await;

    let cases = [
        json!({ "email": "not-an-email", "password": "long-enough", "name": "X" }),
        json!({ "email": "x@uni.test", "password": "short", "name": "X" }),
        json!({ "email": "x@uni.test", "password": "long-enough", "name": "   " }),
    ];
    for payload in cases {
        let (status, _) = app.call("POST", "/api/v1/auth/signup", None, Some(payload.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {} should be rejected", payload);
    }
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::new().await;
    app.create_user("grace@uni.test", Role::User).await;

    // Unknown addresses get the same answer
    let (status, _) = app.call("POST", "/api/v1/auth/forgot-password", None, Some(json!({ "email": "ghost@uni.test" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call("POST", "/api/v1/auth/forgot-password", None, Some(json!({ "email": "grace@uni.test" }))).await;
    assert_eq!(status, StatusCode::OK);
    let token = latest_token(&app, "PASSWORD_RESET").await;

    let (status, _) = app.call("POST", "/api/v1/auth/reset-password", None, Some(json!({
        "token": token,
        "password": "cobol-forever"
    }))).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(login_status(&app, "grace@uni.test", PASSWORD).await, StatusCode::UNAUTHORIZED);
    assert_eq!(login_status(&app, "grace@uni.test", "cobol-forever").await, StatusCode::OK);

    let (status, _) = app.call("POST", "/api/v1/auth/reset-password", None, Some(json!({
        "token": token,
        "password": "another-password"
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_requests_need_cookie_and_csrf() {
    let app = TestApp::new().await;
    let (_, auth) = app.user_with_role(Role::User).await;

    let (status, _) = app.call("GET", "/api/v1/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Cookie present, CSRF header missing on a write
    let response = app.router.clone().oneshot(
        Request::builder()
            .method("PUT")
            .uri("/api/v1/me")
            .header(header::COOKIE, format!("access_token={}", auth.access_token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "bio": "hello" }).to_string()))
            .unwrap()
    ).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let (status, body) = app.call("PUT", "/api/v1/me", Some(&auth), Some(json!({
        "title": "Dr.",
        "institution": "University of Testing",
        "bio": "hello"
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Dr.");
    assert_eq!(body["institution"], "University of Testing");
}

#[tokio::test]
async fn test_change_password_checks_current() {
    let app = TestApp::new().await;
    let user = app.create_user("linus@uni.test", Role::User).await;
    let auth = app.login(&user.email, PASSWORD).await;

    let (status, _) = app.call("PUT", "/api/v1/me/password", Some(&auth), Some(json!({
        "current_password": "not-my-password",
        "new_password": "brand-new-password"
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.call("PUT", "/api/v1/me/password", Some(&auth), Some(json!({
        "current_password": PASSWORD,
        "new_password": "brand-new-password"
    }))).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(login_status(&app, &user.email, "brand-new-password").await, StatusCode::OK);
}
