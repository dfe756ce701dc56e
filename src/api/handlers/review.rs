use axum::{extract::{State, Path}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AuthUser;
use crate::api::dtos::requests::{ReviewDecisionRequest, SubmitForReviewRequest};
use crate::api::handlers::access::load_event;
use crate::domain::models::job::{self, Job};
use crate::domain::services::workflow;
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

pub async fn submit_for_review(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    Json(payload): Json<SubmitForReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut event = load_event(&state, &event_id).await?;
    let reviewer = state.user_repo.find_by_id(&payload.reviewer_id).await?
        .ok_or(AppError::Validation("Reviewer not found".into()))?;

    workflow::submit(&mut event, &user, &reviewer)?;
    let updated = state.event_repo.update(&event).await?;

    state.job_repo.create(&Job::for_event(job::REVIEW_REQUESTED, &reviewer.id, &updated.id)).await?;

    info!("Event {} submitted for review to {}", updated.id, reviewer.id);
    Ok(Json(updated))
}

pub async fn approve_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    Json(payload): Json<ReviewDecisionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut event = load_event(&state, &event_id).await?;
    let comment = payload.comment.filter(|c| !c.trim().is_empty());

    workflow::approve(&mut event, &user, comment)?;
    let updated = state.event_repo.update(&event).await?;

    state.job_repo.create(&Job::for_event(job::REVIEW_DECISION, &updated.created_by, &updated.id)).await?;

    info!("Event {} approved by {}", updated.id, user.id);
    Ok(Json(updated))
}

pub async fn reject_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    Json(payload): Json<ReviewDecisionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut event = load_event(&state, &event_id).await?;

    workflow::reject(&mut event, &user, payload.comment.unwrap_or_default())?;
    let updated = state.event_repo.update(&event).await?;

    state.job_repo.create(&Job::for_event(job::REVIEW_DECISION, &updated.created_by, &updated.id)).await?;

    info!("Event {} rejected by {}", updated.id, user.id);
    Ok(Json(updated))
}

pub async fn publish_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut event = load_event(&state, &event_id).await?;

    workflow::publish(&mut event, &user)?;
    if event.has_ended() {
        return Err(AppError::Validation("Event has already ended".into()));
    }
    let updated = state.event_repo.update(&event).await?;

    info!("Event {} published by {}", updated.id, user.id);
    Ok(Json(updated))
}

/// Cancels the event, drops scheduled mails of every registration, tells
/// registrants and closes the lounge room. Registrations are kept for the record.
pub async fn cancel_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut event = load_event(&state, &event_id).await?;

    workflow::cancel(&mut event, &user)?;
    let updated = state.event_repo.update(&event).await?;

    let registrations = state.registration_repo.list_by_event(&updated.id).await?;
    for registration in &registrations {
        state.job_repo.cancel_jobs_for_registration(&registration.id).await?;
        state.job_repo.create(&Job::for_event(job::EVENT_CANCELLED, &registration.user_id, &updated.id)).await?;
    }

    state.lounge.close_room(&updated.id, "The event has been cancelled").await;

    info!("Event {} cancelled by {}; {} registrants notified", updated.id, user.id, registrations.len());
    Ok(Json(updated))
}
