mod common;

use axum::http::StatusCode;
use common::{AuthHeaders, TestApp};
use eventhub::domain::models::user::Role;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::task::JoinSet;

async fn register(app: &TestApp, event_id: &str, auth: &AuthHeaders) -> Value {
    let (status, body) = app.call("POST", &format!("/api/v1/events/{}/registrations", event_id), Some(auth), None).await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);
    body
}

async fn my_registration(app: &TestApp, event_id: &str, auth: &AuthHeaders) -> Value {
    let (status, body) = app.call("GET", &format!("/api/v1/events/{}/registrations/me", event_id), Some(auth), None).await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn available_seats(app: &TestApp, event_id: &str) -> i64 {
    let (_, body) = app.call("GET", &format!("/api/v1/events/{}", event_id), None, None).await;
    body["available_seats"].as_i64().unwrap()
}

#[tokio::test]
async fn test_waitlist_and_promotion() {
    let app = TestApp::new().await;
    let (_, lecturer) = app.user_with_role(Role::Lecturer).await;
    let (reviewer, reviewer_auth) = app.user_with_role(Role::Staff).await;
    let event_id = app.published_event(&lecturer, &reviewer, &reviewer_auth, 2).await;

    let mut students = Vec::new();
    for _ in 0..4 {
        students.push(app.user_with_role(Role::User).await.1);
    }

    let first = register(&app, &event_id, &students[0]).await;
    assert_eq!(first["status"], "REGISTERED");
    assert!(first["qr_code"].as_str().unwrap().starts_with("EVH-"));
    assert!(first["waitlist_position"].is_null());

    let second = register(&app, &event_id, &students[1]).await;
    assert_eq!(second["status"], "REGISTERED");
    assert_eq!(available_seats(&app, &event_id).await, 0);

    let third = register(&app, &event_id, &students[2]).await;
    assert_eq!(third["status"], "WAITLISTED");
    assert_eq!(third["waitlist_position"], 1);
    assert!(third["qr_code"].is_null());

    let fourth = register(&app, &event_id, &students[3]).await;
    assert_eq!(fourth["waitlist_position"], 2);

    let (status, _) = app.call("POST", &format!("/api/v1/events/{}/registrations", event_id), Some(&students[0]), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // A seat frees up: the head of the queue moves in, the rest shift up
    let (status, _) = app.call("DELETE", &format!("/api/v1/events/{}/registrations/me", event_id), Some(&students[0]), None).await;
    assert_eq!(status, StatusCode::OK);

    let promoted = my_registration(&app, &event_id, &students[2]).await;
    assert_eq!(promoted["status"], "REGISTERED");
    assert!(promoted["qr_code"].is_string());
    assert!(promoted["waitlist_position"].is_null());

    let still_waiting = my_registration(&app, &event_id, &students[3]).await;
    assert_eq!(still_waiting["status"], "WAITLISTED");
    assert_eq!(still_waiting["waitlist_position"], 1);
    assert_eq!(available_seats(&app, &event_id).await, 0);

    let (status, _) = app.call("GET", &format!("/api/v1/events/{}/registrations/me", event_id), Some(&students[0]), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let promotions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE job_type = 'WAITLIST_PROMOTED'")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(promotions, 1);
}

#[tokio::test]
async fn test_leaving_waitlist_renumbers_queue() {
    let app = TestApp::new().await;
    let (_, lecturer) = app.user_with_role(Role::Lecturer).await;
    let (reviewer, reviewer_auth) = app.user_with_role(Role::Staff).await;
    let event_id = app.published_event(&lecturer, &reviewer, &reviewer_auth, 1).await;

    let mut students = Vec::new();
    for _ in 0..4 {
        let (_, auth) = app.user_with_role(Role::User).await;
        register(&app, &event_id, &auth).await;
        students.push(auth);
    }

    // Leave from the middle of the queue
    app.call("DELETE", &format!("/api/v1/events/{}/registrations/me", event_id), Some(&students[2]), None).await;

    let positions: Vec<i64> = sqlx::query_scalar(
        "SELECT waitlist_position FROM registrations WHERE event_id = ? AND status = 'WAITLISTED' ORDER BY waitlist_position"
    )
        .bind(&event_id)
        .fetch_all(&app.pool)
        .await
        .unwrap();
    assert_eq!(positions, vec![1, 2]);
    assert_eq!(my_registration(&app, &event_id, &students[3]).await["waitlist_position"], 2);
    assert_eq!(available_seats(&app, &event_id).await, 0);
}

#[tokio::test]
async fn test_capacity_change_promotes_waitlist() {
    let app = TestApp::new().await;
    let (_, lecturer) = app.user_with_role(Role::Lecturer).await;
    let (reviewer, reviewer_auth) = app.user_with_role(Role::Staff).await;
    let event_id = app.published_event(&lecturer, &reviewer, &reviewer_auth, 1).await;

    let mut students = Vec::new();
    for _ in 0..3 {
        let (_, auth) = app.user_with_role(Role::User).await;
        register(&app, &event_id, &auth).await;
        students.push(auth);
    }

    // Published events are edited by staff only
    let (status, _) = app.call("PUT", &format!("/api/v1/events/{}", event_id), Some(&lecturer), Some(json!({ "capacity": 2 }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.call("PUT", &format!("/api/v1/events/{}", event_id), Some(&reviewer_auth), Some(json!({ "capacity": 2 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["capacity"], 2);
    assert_eq!(body["available_seats"], 0);

    assert_eq!(my_registration(&app, &event_id, &students[1]).await["status"], "REGISTERED");
    let last = my_registration(&app, &event_id, &students[2]).await;
    assert_eq!(last["status"], "WAITLISTED");
    assert_eq!(last["waitlist_position"], 1);

    // Cannot drop below taken seats, and nothing else in the request is applied
    let (status, _) = app.call("PUT", &format!("/api/v1/events/{}", event_id), Some(&reviewer_auth), Some(json!({
        "capacity": 1,
        "title": "Renamed Colloquium"
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, event) = app.call("GET", &format!("/api/v1/events/{}", event_id), None, None).await;
    assert_eq!(event["title"], "Distributed Systems Colloquium");
    assert_eq!(event["capacity"], 2);

    let (status, body) = app.call("PUT", &format!("/api/v1/events/{}", event_id), Some(&reviewer_auth), Some(json!({ "capacity": 5 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available_seats"], 2);
    assert_eq!(my_registration(&app, &event_id, &students[2]).await["status"], "REGISTERED");
}

#[tokio::test]
async fn test_check_in_is_single_use() {
    let app = TestApp::new().await;
    let (_, lecturer) = app.user_with_role(Role::Lecturer).await;
    let (reviewer, reviewer_auth) = app.user_with_role(Role::Staff).await;
    let (student, student_auth) = app.user_with_role(Role::User).await;
    let (_, outsider) = app.user_with_role(Role::Lecturer).await;
    let event_id = app.published_event(&lecturer, &reviewer, &reviewer_auth, 10).await;

    let registration = register(&app, &event_id, &student_auth).await;
    let qr_code = registration["qr_code"].as_str().unwrap();
    let uri = format!("/api/v1/events/{}/check-in", event_id);

    let (status, _) = app.call("POST", &uri, Some(&student_auth), Some(json!({ "qr_code": qr_code }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call("POST", &uri, Some(&outsider), Some(json!({ "qr_code": qr_code }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call("POST", &uri, Some(&lecturer), Some(json!({ "qr_code": "EVH-forged" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.call("POST", &uri, Some(&lecturer), Some(json!({ "qr_code": qr_code }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["registration"]["status"], "ATTENDED");
    assert!(body["registration"]["checked_in_at"].is_string());
    assert_eq!(body["attendee"]["id"], student.id.as_str());

    let (status, _) = app.call("POST", &uri, Some(&reviewer_auth), Some(json!({ "qr_code": qr_code }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, details) = app.call("GET", &format!("/api/v1/events/{}", event_id), None, None).await;
    assert_eq!(details["counts"]["attended"], 1);

    // Attendance is final
    let (status, _) = app.call("DELETE", &format!("/api/v1/events/{}/registrations/me", event_id), Some(&student_auth), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_organizer_manages_attendees() {
    let app = TestApp::new().await;
    let (_, lecturer) = app.user_with_role(Role::Lecturer).await;
    let (reviewer, reviewer_auth) = app.user_with_role(Role::Staff).await;
    let (_, first) = app.user_with_role(Role::User).await;
    let (_, second) = app.user_with_role(Role::User).await;
    let event_id = app.published_event(&lecturer, &reviewer, &reviewer_auth, 1).await;

    let seated = register(&app, &event_id, &first).await;
    register(&app, &event_id, &second).await;

    let (status, _) = app.call("GET", &format!("/api/v1/events/{}/attendees", event_id), Some(&first), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, attendees) = app.call("GET", &format!("/api/v1/events/{}/attendees", event_id), Some(&lecturer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(attendees.as_array().unwrap().len(), 2);

    let (status, _) = app.call("DELETE", &format!("/api/v1/events/{}/attendees/{}", event_id, seated["id"].as_str().unwrap()), Some(&lecturer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(my_registration(&app, &event_id, &second).await["status"], "REGISTERED");

    let (_, mine) = app.call("GET", "/api/v1/me/registrations", Some(&second), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_never_overbook() {
    const CAPACITY: usize = 2;
    const ATTENDEES: usize = 12;

    let app = Arc::new(TestApp::new().await);
    let (_, lecturer) = app.user_with_role(Role::Lecturer).await;
    let (reviewer, reviewer_auth) = app.user_with_role(Role::Staff).await;
    let event_id = app.published_event(&lecturer, &reviewer, &reviewer_auth, CAPACITY as i32).await;

    let mut attendees = Vec::new();
    for _ in 0..ATTENDEES {
        attendees.push(app.user_with_role(Role::User).await.1);
    }

    let mut tasks = JoinSet::new();
    for auth in attendees {
        let app = app.clone();
        let uri = format!("/api/v1/events/{}/registrations", event_id);
        tasks.spawn(async move { app.call("POST", &uri, Some(&auth), None).await });
    }

    let mut seated = 0;
    let mut positions = Vec::new();
    while let Some(result) = tasks.join_next().await {
        let (status, body) = result.unwrap();
        assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);
        match body["status"].as_str().unwrap() {
            "REGISTERED" => seated += 1,
            "WAITLISTED" => positions.push(body["waitlist_position"].as_i64().unwrap()),
            other => panic!("unexpected status {}", other),
        }
    }

    positions.sort_unstable();
    assert_eq!(seated, CAPACITY);
    assert_eq!(positions, (1..=(ATTENDEES - CAPACITY) as i64).collect::<Vec<_>>());
    assert_eq!(available_seats(&app, &event_id).await, 0);
}
