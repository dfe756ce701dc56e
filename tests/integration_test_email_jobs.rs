mod common;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use common::TestApp;
use eventhub::domain::models::user::Role;
use serde_json::json;

async fn drain_jobs(app: &TestApp) {
    while app.run_jobs().await > 0 {}
}

async fn job_statuses(app: &TestApp, job_type: &str) -> Vec<String> {
    sqlx::query_scalar("SELECT status FROM jobs WHERE job_type = ? ORDER BY created_at")
        .bind(job_type)
        .fetch_all(&app.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_workflow_and_registration_mails() {
    let app = TestApp::new().await;
    let (lecturer, lecturer_auth) = app.user_with_role(Role::Lecturer).await;
    let (reviewer, reviewer_auth) = app.user_with_role(Role::Staff).await;
    let (student, student_auth) = app.user_with_role(Role::User).await;

    let event_id = app.published_event(&lecturer_auth, &reviewer, &reviewer_auth, 10).await;
    let (_, registration) = app.call("POST", &format!("/api/v1/events/{}/registrations", event_id), Some(&student_auth), None).await;

    drain_jobs(&app).await;
    let sent = app.sent_mail();
    assert_eq!(sent.len(), 3, "unexpected mails: {:?}", sent);

    let review = sent.iter().find(|m| m.recipient == reviewer.email).expect("no mail to reviewer");
    assert_eq!(review.subject, "Review requested: Distributed Systems Colloquium");

    let decision = sent.iter().find(|m| m.recipient == lecturer.email).expect("no mail to creator");
    assert_eq!(decision.subject, "Your event was approved: Distributed Systems Colloquium");

    let confirmation = sent.iter().find(|m| m.recipient == student.email).expect("no mail to attendee");
    assert_eq!(confirmation.subject, "Registration confirmed: Distributed Systems Colloquium");
    assert_eq!(confirmation.attachment_name.as_deref(), Some("event.ics"));
    assert!(confirmation.html_body.contains(registration["qr_code"].as_str().unwrap()));
    assert!(confirmation.html_body.contains(&format!("https://eventhub.test/events/{}", event_id)));

    // The reminder waits until a day before the start
    assert_eq!(job_statuses(&app, "EVENT_REMINDER").await, vec!["PENDING"]);
    assert_eq!(job_statuses(&app, "REGISTRATION_CONFIRMED").await, vec!["COMPLETED"]);
}

#[tokio::test]
async fn test_retried_job_is_not_sent_twice() {
    let app = TestApp::new().await;
    let (_, lecturer) = app.user_with_role(Role::Lecturer).await;
    let (reviewer, reviewer_auth) = app.user_with_role(Role::Staff).await;
    let (student, student_auth) = app.user_with_role(Role::User).await;

    let event_id = app.published_event(&lecturer, &reviewer, &reviewer_auth, 10).await;
    app.call("POST", &format!("/api/v1/events/{}/registrations", event_id), Some(&student_auth), None).await;
    drain_jobs(&app).await;
    let before = app.sent_mail().len();

    // Simulate a crash after sending but before the job was marked done
    sqlx::query("UPDATE jobs SET status = 'PENDING' WHERE job_type = 'REGISTRATION_CONFIRMED'")
        .execute(&app.pool)
        .await
        .unwrap();
    drain_jobs(&app).await;

    assert_eq!(app.sent_mail().len(), before);

    let statuses: Vec<String> = sqlx::query_scalar(
        "SELECT status FROM mail_logs WHERE recipient = ? AND template_id = 'registration_confirmed' ORDER BY sent_at"
    )
        .bind(&student.email)
        .fetch_all(&app.pool)
        .await
        .unwrap();
    assert_eq!(statuses, vec!["SENT", "SKIPPED_DUPLICATE"]);
}

#[tokio::test]
async fn test_resubmitted_event_requests_review_again() {
    let app = TestApp::new().await;
    let (lecturer, lecturer_auth) = app.user_with_role(Role::Lecturer).await;
    let (reviewer, reviewer_auth) = app.user_with_role(Role::Staff).await;
    let event_id = app.draft_event(&lecturer_auth, 10).await;
    let submit = json!({ "reviewer_id": reviewer.id });

    let (status, _) = app.call("POST", &format!("/api/v1/events/{}/submit", event_id), Some(&lecturer_auth), Some(submit.clone())).await;
    assert_eq!(status, StatusCode::OK);
    drain_jobs(&app).await;

    let (status, _) = app.call("POST", &format!("/api/v1/events/{}/reject", event_id), Some(&reviewer_auth), Some(json!({ "comment": "Add an abstract" }))).await;
    assert_eq!(status, StatusCode::OK);
    drain_jobs(&app).await;

    let (status, _) = app.call("POST", &format!("/api/v1/events/{}/submit", event_id), Some(&lecturer_auth), Some(submit)).await;
    assert_eq!(status, StatusCode::OK);
    drain_jobs(&app).await;

    let sent = app.sent_mail();
    let review_requests = sent.iter()
        .filter(|m| m.recipient == reviewer.email && m.subject == "Review requested: Distributed Systems Colloquium")
        .count();
    assert_eq!(review_requests, 2, "unexpected mails: {:?}", sent);
    assert!(sent.iter().any(|m| m.recipient == lecturer.email && m.subject == "Your event was rejected: Distributed Systems Colloquium"));
    assert_eq!(job_statuses(&app, "REVIEW_REQUESTED").await, vec!["COMPLETED", "COMPLETED"]);
}

#[tokio::test]
async fn test_rejoining_the_waitlist_sends_a_new_notice() {
    let app = TestApp::new().await;
    let (_, lecturer) = app.user_with_role(Role::Lecturer).await;
    let (reviewer, reviewer_auth) = app.user_with_role(Role::Staff).await;
    let (_, holder_auth) = app.user_with_role(Role::User).await;
    let (student, student_auth) = app.user_with_role(Role::User).await;

    let event_id = app.published_event(&lecturer, &reviewer, &reviewer_auth, 1).await;
    let registrations = format!("/api/v1/events/{}/registrations", event_id);
    app.call("POST", &registrations, Some(&holder_auth), None).await;

    let (_, first) = app.call("POST", &registrations, Some(&student_auth), None).await;
    assert_eq!(first["waitlist_position"], 1);
    drain_jobs(&app).await;

    let (status, _) = app.call("DELETE", &format!("{}/me", registrations), Some(&student_auth), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = app.call("POST", &registrations, Some(&student_auth), None).await;
    assert_eq!(second["waitlist_position"], 1);
    drain_jobs(&app).await;

    let notices = app.sent_mail().into_iter()
        .filter(|m| m.recipient == student.email && m.subject.starts_with("Waitlist position 1"))
        .count();
    assert_eq!(notices, 2);
}

#[tokio::test]
async fn test_moving_the_start_reschedules_reminders() {
    let app = TestApp::new().await;
    let (_, lecturer) = app.user_with_role(Role::Lecturer).await;
    let (reviewer, reviewer_auth) = app.user_with_role(Role::Staff).await;
    let (_, seated) = app.user_with_role(Role::User).await;
    let (_, waiting) = app.user_with_role(Role::User).await;

    let event_id = app.published_event(&lecturer, &reviewer, &reviewer_auth, 1).await;
    app.call("POST", &format!("/api/v1/events/{}/registrations", event_id), Some(&seated), None).await;
    app.call("POST", &format!("/api/v1/events/{}/registrations", event_id), Some(&waiting), None).await;
    assert_eq!(job_statuses(&app, "EVENT_REMINDER").await, vec!["PENDING"]);

    let start = Utc::now() + Duration::days(10);
    let (status, body) = app.call("PUT", &format!("/api/v1/events/{}", event_id), Some(&reviewer_auth), Some(json!({
        "start_time": start.to_rfc3339(),
        "end_time": (start + Duration::hours(2)).to_rfc3339()
    }))).await;
    assert_eq!(status, StatusCode::OK, "update failed: {}", body);

    // Only the seat holder is reminded, at the new time
    assert_eq!(job_statuses(&app, "EVENT_REMINDER").await, vec!["CANCELLED", "PENDING"]);
    let execute_at: DateTime<Utc> = sqlx::query_scalar("SELECT execute_at FROM jobs WHERE job_type = 'EVENT_REMINDER' AND status = 'PENDING'")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    let expected = start - Duration::hours(24);
    assert!((execute_at - expected).num_seconds().abs() < 1, "reminder at {} instead of {}", execute_at, expected);

    // Editing other fields leaves the schedule alone
    let (status, _) = app.call("PUT", &format!("/api/v1/events/{}", event_id), Some(&reviewer_auth), Some(json!({ "title": "Consensus Colloquium" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job_statuses(&app, "EVENT_REMINDER").await, vec!["CANCELLED", "PENDING"]);
}

#[tokio::test]
async fn test_withdrawn_registrations_get_no_mail() {
    let app = TestApp::new().await;
    let (_, lecturer) = app.user_with_role(Role::Lecturer).await;
    let (reviewer, reviewer_auth) = app.user_with_role(Role::Staff).await;
    let (first, first_auth) = app.user_with_role(Role::User).await;
    let (second, second_auth) = app.user_with_role(Role::User).await;

    let event_id = app.published_event(&lecturer, &reviewer, &reviewer_auth, 1).await;
    drain_jobs(&app).await;

    app.call("POST", &format!("/api/v1/events/{}/registrations", event_id), Some(&first_auth), None).await;
    app.call("POST", &format!("/api/v1/events/{}/registrations", event_id), Some(&second_auth), None).await;

    // The seat holder leaves before the worker runs; the waitlisted user moves up
    app.call("DELETE", &format!("/api/v1/events/{}/registrations/me", event_id), Some(&first_auth), None).await;

    assert_eq!(job_statuses(&app, "REGISTRATION_CONFIRMED").await, vec!["CANCELLED"]);

    drain_jobs(&app).await;
    let sent = app.sent_mail();
    assert!(sent.iter().all(|m| m.recipient != first.email));

    let second_subjects: Vec<&str> = sent.iter()
        .filter(|m| m.recipient == second.email)
        .map(|m| m.subject.as_str())
        .collect();
    // The waitlist notice went stale with the promotion
    assert_eq!(second_subjects, vec!["You got a seat: Distributed Systems Colloquium"]);
}

#[tokio::test]
async fn test_cancellation_notifies_registrants() {
    let app = TestApp::new().await;
    let (_, lecturer) = app.user_with_role(Role::Lecturer).await;
    let (reviewer, reviewer_auth) = app.user_with_role(Role::Staff).await;
    let (student, student_auth) = app.user_with_role(Role::User).await;

    let event_id = app.published_event(&lecturer, &reviewer, &reviewer_auth, 10).await;
    app.call("POST", &format!("/api/v1/events/{}/registrations", event_id), Some(&student_auth), None).await;
    app.call("POST", &format!("/api/v1/events/{}/cancel", event_id), Some(&lecturer), None).await;

    drain_jobs(&app).await;

    let student_mail: Vec<String> = app.sent_mail().into_iter()
        .filter(|m| m.recipient == student.email)
        .map(|m| m.subject)
        .collect();
    assert_eq!(student_mail, vec!["Cancelled: Distributed Systems Colloquium".to_string()]);
    assert_eq!(job_statuses(&app, "EVENT_REMINDER").await, vec!["CANCELLED"]);
}

#[tokio::test]
async fn test_verification_mail_skipped_once_verified() {
    let app = TestApp::new().await;

    let (status, _) = app.call("POST", "/api/v1/auth/signup", None, Some(json!({
        "email": "hopper@uni.test",
        "password": "flow-matic",
        "name": "Grace Hopper"
    }))).await;
    assert_eq!(status, StatusCode::CREATED);

    sqlx::query("UPDATE users SET email_verified = 1 WHERE email = 'hopper@uni.test'")
        .execute(&app.pool)
        .await
        .unwrap();

    drain_jobs(&app).await;
    assert!(app.sent_mail().is_empty());
    assert_eq!(job_statuses(&app, "VERIFY_EMAIL").await, vec!["COMPLETED"]);

    app.call("POST", "/api/v1/auth/forgot-password", None, Some(json!({ "email": "hopper@uni.test" }))).await;
    drain_jobs(&app).await;

    let sent = app.sent_mail();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Reset your EventHub password");
    assert!(sent[0].html_body.contains("https://eventhub.test/reset-password?token="));
}

#[tokio::test]
async fn test_outbox_is_visible_to_staff() {
    let app = TestApp::new().await;
    let (_, lecturer) = app.user_with_role(Role::Lecturer).await;
    let (reviewer, reviewer_auth) = app.user_with_role(Role::Staff).await;

    app.published_event(&lecturer, &reviewer, &reviewer_auth, 10).await;
    drain_jobs(&app).await;

    let (status, _) = app.call("GET", "/api/v1/admin/jobs", Some(&lecturer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, jobs) = app.call("GET", "/api/v1/admin/jobs?limit=1", Some(&reviewer_auth), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(jobs.as_array().unwrap().len(), 1);

    let (status, logs) = app.call("GET", &format!("/api/v1/admin/mail-logs?recipient={}", reviewer.email), Some(&reviewer_auth), None).await;
    assert_eq!(status, StatusCode::OK);
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["template_id"], "review_requested");
    assert_eq!(logs[0]["status"], "SENT");
}
