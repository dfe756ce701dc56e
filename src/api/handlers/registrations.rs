use axum::{extract::{State, Path}, response::IntoResponse, Json, http::StatusCode};
use crate::state::AppState;
use crate::api::extractors::auth::AuthUser;
use crate::api::handlers::access::{ensure_organizer_or_staff, load_event};
use crate::domain::models::{
    event::{Event, EventStatus},
    registration::{CancellationOutcome, Registration},
};
use crate::domain::services::notifications::{promotion_jobs, registration_jobs};
use crate::error::AppError;
use std::sync::Arc;
use chrono::Utc;
use tracing::info;

pub async fn register(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    if event.status != EventStatus::Published {
        return Err(AppError::Conflict("Event is not open for registration".into()));
    }
    if event.has_ended() {
        return Err(AppError::Conflict("Event has already ended".into()));
    }
    if state.registration_repo.find_for_user(&event.id, &user.id).await?.is_some() {
        return Err(AppError::Conflict("You are already registered for this event".into()));
    }

    let registration = state.registration_repo
        .register(&Registration::pending(event.id.clone(), user.id.clone()))
        .await?;

    for job in registration_jobs(&registration, &event, Utc::now()) {
        state.job_repo.create(&job).await?;
    }

    info!("User {} registered for {} as {}", user.id, event.id, registration.status.as_str());
    Ok((StatusCode::CREATED, Json(registration)))
}

pub async fn get_my_registration(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let registration = state.registration_repo.find_for_user(&event_id, &user.id).await?
        .ok_or(AppError::NotFound("You are not registered for this event".into()))?;
    Ok(Json(registration))
}

pub async fn cancel_my_registration(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    let registration = state.registration_repo.find_for_user(&event.id, &user.id).await?
        .ok_or(AppError::NotFound("You are not registered for this event".into()))?;

    let outcome = cancel_registration(&state, &event, &registration).await?;
    info!("User {} cancelled registration for {}", user.id, event.id);
    Ok(Json(outcome.cancelled))
}

pub async fn list_attendees(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    ensure_organizer_or_staff(&state, &event, &user).await?;

    let attendees = state.registration_repo.list_attendees(&event.id).await?;
    Ok(Json(attendees))
}

pub async fn remove_attendee(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((event_id, registration_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    ensure_organizer_or_staff(&state, &event, &user).await?;

    let registration = state.registration_repo.find_by_id(&registration_id).await?
        .filter(|r| r.event_id == event.id)
        .ok_or(AppError::NotFound("Registration not found".into()))?;

    let outcome = cancel_registration(&state, &event, &registration).await?;
    info!("User {} removed registration {} from {}", user.id, registration.id, event.id);
    Ok(Json(outcome.cancelled))
}

/// Removes the registration, drops its scheduled mails and notifies whoever
/// moved up from the waitlist.
async fn cancel_registration(state: &AppState, event: &Event, registration: &Registration) -> Result<CancellationOutcome, AppError> {
    if event.status == EventStatus::Cancelled || event.has_ended() {
        return Err(AppError::Conflict("Registrations of past or cancelled events cannot be changed".into()));
    }

    let outcome = state.registration_repo.cancel(registration).await?;
    state.job_repo.cancel_jobs_for_registration(&outcome.cancelled.id).await?;

    if let Some(promoted) = &outcome.promoted {
        for job in promotion_jobs(promoted, event, Utc::now()) {
            state.job_repo.create(&job).await?;
        }
        info!("Registration {} promoted from waitlist for {}", promoted.id, event.id);
    }
    Ok(outcome)
}
