mod common;

use axum::http::StatusCode;
use common::{TestApp, PASSWORD};
use eventhub::domain::models::user::Role;
use serde_json::json;

#[tokio::test]
async fn test_category_management() {
    let app = TestApp::new().await;
    let (_, staff) = app.user_with_role(Role::Staff).await;
    let (_, lecturer) = app.user_with_role(Role::Lecturer).await;

    let (status, _) = app.call("POST", "/api/v1/categories", Some(&lecturer), Some(json!({ "name": "Seminar" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call("POST", "/api/v1/categories", Some(&staff), Some(json!({ "name": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, category) = app.call("POST", "/api/v1/categories", Some(&staff), Some(json!({
        "name": "Seminar",
        "description": "Small-group sessions"
    }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = category["id"].as_str().unwrap().to_string();

    let (status, _) = app.call("POST", "/api/v1/categories", Some(&staff), Some(json!({ "name": "Seminar" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, list) = app.call("GET", "/api/v1/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, renamed) = app.call("PUT", &format!("/api/v1/categories/{}", category_id), Some(&staff), Some(json!({ "name": "Research Seminar" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Research Seminar");

    // Referenced categories stay
    let event_id = app.draft_event(&lecturer, 5).await;
    let (status, _) = app.call("PUT", &format!("/api/v1/events/{}", event_id), Some(&lecturer), Some(json!({ "category_id": category_id }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call("DELETE", &format!("/api/v1/categories/{}", category_id), Some(&staff), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.call("DELETE", &format!("/api/v1/events/{}", event_id), Some(&lecturer), None).await;
    let (status, _) = app.call("DELETE", &format!("/api/v1/categories/{}", category_id), Some(&staff), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_role_changes() {
    let app = TestApp::new().await;
    let (admin, staff) = app.user_with_role(Role::Staff).await;
    let (student, student_auth) = app.user_with_role(Role::User).await;

    let (status, _) = app.call("GET", "/api/v1/users", Some(&student_auth), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call("PUT", &format!("/api/v1/users/{}/role", admin.id), Some(&staff), Some(json!({ "role": "USER" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.call("PUT", &format!("/api/v1/users/{}/role", student.id), Some(&student_auth), Some(json!({ "role": "STAFF" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app.call("PUT", &format!("/api/v1/users/{}/role", student.id), Some(&staff), Some(json!({ "role": "LECTURER" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["role"], "LECTURER");

    // The new role applies without logging in again
    let draft = app.draft_event(&student_auth, 5).await;
    assert!(!draft.is_empty());

    let (_, lecturers) = app.call("GET", "/api/v1/users?role=LECTURER", Some(&staff), None).await;
    assert_eq!(lecturers.as_array().unwrap().len(), 1);
    assert_eq!(lecturers[0]["id"], student.id.as_str());
}

#[tokio::test]
async fn test_deactivation_locks_account() {
    let app = TestApp::new().await;
    let (_, staff) = app.user_with_role(Role::Staff).await;
    let (student, student_auth) = app.user_with_role(Role::User).await;

    let (status, body) = app.call("PUT", &format!("/api/v1/users/{}/status", student.id), Some(&staff), Some(json!({ "is_active": false }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);

    let (status, _) = app.call("GET", "/api/v1/me", Some(&student_auth), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.call("POST", "/api/v1/auth/login", None, Some(json!({
        "email": student.email,
        "password": PASSWORD
    }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call("GET", &format!("/api/v1/users/{}/profile", student.id), Some(&staff), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let refresh_tokens: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?")
        .bind(&student.id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(refresh_tokens, 0);

    app.call("PUT", &format!("/api/v1/users/{}/status", student.id), Some(&staff), Some(json!({ "is_active": true }))).await;
    app.login(&student.email, PASSWORD).await;
}

#[tokio::test]
async fn test_lecturer_assignment() {
    let app = TestApp::new().await;
    let (_, creator) = app.user_with_role(Role::Lecturer).await;
    let (guest, guest_auth) = app.user_with_role(Role::Lecturer).await;
    let (student, _) = app.user_with_role(Role::User).await;

    let event_id = app.draft_event(&creator, 5).await;
    let uri = format!("/api/v1/events/{}/lecturers", event_id);

    let (status, _) = app.call("POST", &uri, Some(&creator), Some(json!({ "user_id": student.id }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.call("POST", &uri, Some(&guest_auth), Some(json!({ "user_id": guest.id }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call("POST", &uri, Some(&creator), Some(json!({ "user_id": guest.id }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.call("POST", &uri, Some(&creator), Some(json!({ "user_id": guest.id }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Co-lecturers see the draft and appear in its details
    let (status, details) = app.call("GET", &format!("/api/v1/events/{}", event_id), Some(&guest_auth), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["lecturers"].as_array().unwrap().len(), 2);

    let (status, _) = app.call("DELETE", &format!("{}/{}", uri, guest.id), Some(&creator), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.call("DELETE", &format!("{}/{}", uri, guest.id), Some(&creator), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
