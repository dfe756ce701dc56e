use axum::{extract::{State, Path}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AuthUser;
use crate::api::dtos::{requests::CheckInRequest, responses::CheckInResponse};
use crate::api::handlers::access::{ensure_organizer_or_staff, load_event};
use crate::domain::models::{event::EventStatus, registration::RegistrationStatus, user::PublicProfile};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

/// Scans a QR payload at the door. Each seat can be checked in once.
pub async fn check_in(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    Json(payload): Json<CheckInRequest>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    ensure_organizer_or_staff(&state, &event, &user).await?;
    if event.status != EventStatus::Published {
        return Err(AppError::Conflict("Only published events accept check-ins".into()));
    }

    let registration = state.registration_repo.find_by_qr_code(&event.id, payload.qr_code.trim()).await?
        .ok_or(AppError::NotFound("No registration with this code for this event".into()))?;

    if registration.status == RegistrationStatus::Attended {
        return Err(AppError::Conflict("Attendee is already checked in".into()));
    }

    // A concurrent scan may have won between the lookup and this update.
    let checked_in = state.registration_repo.mark_attended(&registration.id).await?
        .ok_or(AppError::Conflict("Attendee is already checked in".into()))?;

    let attendee = state.user_repo.find_by_id(&checked_in.user_id).await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    info!("Checked in registration {} for {} (by {})", checked_in.id, event.id, user.id);
    Ok(Json(CheckInResponse {
        registration: checked_in,
        attendee: PublicProfile::from(&attendee),
    }))
}
