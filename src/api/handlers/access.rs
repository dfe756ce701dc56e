//! Shared lookups and permission checks for event-scoped handlers.

use crate::state::AppState;
use crate::domain::models::{event::{Event, EventStatus}, user::User};
use crate::domain::services::workflow::{is_creator, is_reviewer};
use crate::error::AppError;

pub async fn load_event(state: &AppState, event_id: &str) -> Result<Event, AppError> {
    state.event_repo.find_by_id(event_id).await?
        .ok_or(AppError::NotFound("Event not found".into()))
}

/// Creator or one of the event's lecturers.
pub async fn is_organizer(state: &AppState, event: &Event, user: &User) -> Result<bool, AppError> {
    if is_creator(event, user) {
        return Ok(true);
    }
    state.event_repo.is_lecturer(&event.id, &user.id).await
}

pub async fn ensure_organizer_or_staff(state: &AppState, event: &Event, user: &User) -> Result<(), AppError> {
    if user.is_staff() || is_organizer(state, event, user).await? {
        return Ok(());
    }
    Err(AppError::Forbidden("Only organizers or staff can do this".into()))
}

/// Unpublished events are only visible to the people working on them.
/// Everyone else gets a 404, as if the event did not exist.
pub async fn ensure_visible(state: &AppState, event: &Event, user: Option<&User>) -> Result<(), AppError> {
    if matches!(event.status, EventStatus::Published | EventStatus::Cancelled) {
        return Ok(());
    }
    if let Some(user) = user {
        if user.is_staff() || is_reviewer(event, user) || is_organizer(state, event, user).await? {
            return Ok(());
        }
    }
    Err(AppError::NotFound("Event not found".into()))
}

pub async fn holds_seat(state: &AppState, event: &Event, user: &User) -> Result<bool, AppError> {
    Ok(state.registration_repo.find_for_user(&event.id, &user.id).await?
        .is_some_and(|r| r.status.holds_seat()))
}

/// Seat holders, organizers and staff. Used for materials and the lounge.
pub async fn ensure_participant(state: &AppState, event: &Event, user: &User) -> Result<(), AppError> {
    if user.is_staff() || is_organizer(state, event, user).await? || holds_seat(state, event, user).await? {
        return Ok(());
    }
    Err(AppError::Forbidden("Only registered attendees and organizers have access".into()))
}
