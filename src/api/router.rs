use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Request},
    routing::{get, post, put, delete},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{
    auth, calendar, categories, checkin, events, files, health, jobs, lounge, materials, profile,
    registrations, review, users,
};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tower_cookies::CookieManagerLayer;
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

/// Multipart framing on top of the configured file limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(health::health_check))
        .route("/files/{*key}", get(files::serve_file))

        // Auth
        .route("/api/v1/auth/signup", post(auth::signup))
        .route("/api/v1/auth/verify-email", post(auth::verify_email))
        .route("/api/v1/auth/resend-verification", post(auth::resend_verification))
        .route("/api/v1/auth/forgot-password", post(auth::forgot_password))
        .route("/api/v1/auth/reset-password", post(auth::reset_password))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))

        // Own account
        .route("/api/v1/me", get(profile::get_me).put(profile::update_me))
        .route("/api/v1/me/password", put(profile::change_password))
        .route("/api/v1/me/avatar", post(profile::upload_avatar))
        .route("/api/v1/me/registrations", get(profile::my_registrations))
        .route("/api/v1/me/events", get(profile::my_events))
        .route("/api/v1/me/reviews", get(profile::my_reviews))

        // Users & roles
        .route("/api/v1/users", get(users::list_users))
        .route("/api/v1/users/{user_id}/profile", get(profile::public_profile))
        .route("/api/v1/users/{user_id}/role", put(users::set_role))
        .route("/api/v1/users/{user_id}/status", put(users::set_status))

        // Categories
        .route("/api/v1/categories", get(categories::list_categories).post(categories::create_category))
        .route("/api/v1/categories/{category_id}", put(categories::update_category).delete(categories::delete_category))

        // Events
        .route("/api/v1/events", get(events::list_events).post(events::create_event))
        .route("/api/v1/events/{event_id}", get(events::get_event).put(events::update_event).delete(events::delete_event))
        .route("/api/v1/events/{event_id}/lecturers", get(events::list_lecturers).post(events::add_lecturer))
        .route("/api/v1/events/{event_id}/lecturers/{user_id}", delete(events::remove_lecturer))

        // Review workflow
        .route("/api/v1/events/{event_id}/submit", post(review::submit_for_review))
        .route("/api/v1/events/{event_id}/approve", post(review::approve_event))
        .route("/api/v1/events/{event_id}/reject", post(review::reject_event))
        .route("/api/v1/events/{event_id}/publish", post(review::publish_event))
        .route("/api/v1/events/{event_id}/cancel", post(review::cancel_event))

        // Registrations & check-in
        .route("/api/v1/events/{event_id}/registrations", post(registrations::register))
        .route("/api/v1/events/{event_id}/registrations/me", get(registrations::get_my_registration).delete(registrations::cancel_my_registration))
        .route("/api/v1/events/{event_id}/attendees", get(registrations::list_attendees))
        .route("/api/v1/events/{event_id}/attendees/{registration_id}", delete(registrations::remove_attendee))
        .route("/api/v1/events/{event_id}/check-in", post(checkin::check_in))

        // Materials
        .route("/api/v1/events/{event_id}/materials", get(materials::list_materials).post(materials::upload_material))
        .route("/api/v1/events/{event_id}/materials/{material_id}", get(materials::download_material).delete(materials::delete_material))

        // Lounge
        .route("/api/v1/events/{event_id}/lounge/ws", get(lounge::lounge_socket))
        .route("/api/v1/events/{event_id}/lounge/messages", get(lounge::lounge_messages))

        // Calendar
        .route("/api/v1/events/{event_id}/calendar.ics", get(calendar::download_ics))
        .route("/api/v1/events/{event_id}/calendar-links", get(calendar::get_calendar_links))

        // Outbound mail
        .route("/api/v1/admin/jobs", get(jobs::list_jobs))
        .route("/api/v1/admin/mail-logs", get(jobs::list_mail_logs))

        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        user_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .layer(CookieManagerLayer::new())
        .with_state(state)
}
