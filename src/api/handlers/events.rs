use axum::{extract::{State, Path, Query}, response::IntoResponse, Json, http::StatusCode};
use crate::state::AppState;
use crate::api::extractors::{auth::AuthUser, maybe_auth::MaybeAuthUser};
use crate::api::dtos::requests::{CreateEventRequest, LecturerRequest, UpdateEventRequest};
use crate::api::handlers::access::{ensure_visible, load_event};
use crate::domain::models::{
    event::{Event, EventDetails, EventFilter, EventStatus, NewEventParams},
    job,
    user::{PublicProfile, Role, User},
};
use crate::domain::services::{notifications::{promotion_jobs, reminder_job}, waitlist, workflow};
use crate::error::AppError;
use std::sync::Arc;
use chrono::Utc;
use chrono_tz::Tz;
use tracing::info;

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    workflow::ensure_can_create(&user)?;

    let event = Event::new(NewEventParams {
        title: payload.title.trim().to_string(),
        description: payload.description,
        category_id: payload.category_id.filter(|c| !c.is_empty()),
        location: payload.location.trim().to_string(),
        meeting_url: payload.meeting_url.filter(|u| !u.trim().is_empty()),
        timezone: payload.timezone,
        start_time: payload.start_time,
        end_time: payload.end_time,
        capacity: payload.capacity,
        image_url: payload.image_url,
        created_by: user.id.clone(),
    });
    validate_event(&state, &event).await?;

    let created = state.event_repo.create(&event).await?;
    if user.role == Role::Lecturer {
        state.event_repo.add_lecturer(&created.id, &user.id).await?;
    }

    info!("Event created: {} by {}", created.id, user.id);
    Ok((StatusCode::CREATED, Json(created)))
}

/// Public listing. Only staff may look past published events.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(user): MaybeAuthUser,
    Query(mut filter): Query<EventFilter>,
) -> Result<impl IntoResponse, AppError> {
    if !user.as_ref().is_some_and(|u| u.is_staff()) {
        filter.status = Some(EventStatus::Published);
    }
    let events = state.event_repo.list(&filter).await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    ensure_visible(&state, &event, user.as_ref()).await?;

    let category = match &event.category_id {
        Some(id) => state.category_repo.find_by_id(id).await?,
        None => None,
    };
    let lecturers = state.event_repo.list_lecturers(&event.id).await?
        .iter()
        .map(PublicProfile::from)
        .collect();
    let counts = state.registration_repo.counts(&event.id).await?;

    Ok(Json(EventDetails { event, category, lecturers, counts }))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut event = load_event(&state, &event_id).await?;
    workflow::ensure_can_edit(&event, &user)?;

    if let Some(val) = payload.title { event.title = val.trim().to_string(); }
    if let Some(val) = payload.description { event.description = val; }
    if let Some(val) = payload.category_id { event.category_id = Some(val).filter(|c| !c.is_empty()); }
    if let Some(val) = payload.location { event.location = val.trim().to_string(); }
    if let Some(val) = payload.meeting_url { event.meeting_url = Some(val).filter(|u| !u.trim().is_empty()); }
    if let Some(val) = payload.timezone { event.timezone = val; }
    let start_moved = payload.start_time.is_some_and(|t| t != event.start_time);
    if let Some(val) = payload.start_time { event.start_time = val; }
    if let Some(val) = payload.end_time { event.end_time = val; }
    if let Some(val) = payload.image_url { event.image_url = Some(val).filter(|u| !u.is_empty()); }
    let new_capacity = payload.capacity.filter(|c| *c != event.capacity);
    if let Some(val) = new_capacity { event.capacity = val; }

    validate_event(&state, &event).await?;
    if let Some(capacity) = new_capacity {
        let seated = state.registration_repo.counts(&event.id).await?.seated();
        waitlist::plan_capacity_change(capacity, seated, &[])?;
    }

    event.updated_at = Utc::now();
    let mut updated = state.event_repo.update(&event).await?;

    // The resize runs in its own transaction and re-checks the seated count.
    if let Some(capacity) = new_capacity {
        let promoted = state.registration_repo.resize_capacity(&updated.id, capacity).await?;
        let now = Utc::now();
        for registration in &promoted {
            for job in promotion_jobs(registration, &updated, now) {
                state.job_repo.create(&job).await?;
            }
        }
        info!("Capacity of {} set to {}; {} promoted from waitlist", updated.id, capacity, promoted.len());
        updated = load_event(&state, &updated.id).await?;
    }

    if start_moved {
        reschedule_reminders(&state, &updated).await?;
    }

    Ok(Json(updated))
}

/// Replaces the pending reminders of an event after its start time moved.
async fn reschedule_reminders(state: &AppState, event: &Event) -> Result<(), AppError> {
    let cancelled = state.job_repo.cancel_event_jobs(&event.id, job::EVENT_REMINDER).await?;
    if event.status != EventStatus::Published {
        return Ok(());
    }

    let now = Utc::now();
    let mut scheduled = 0;
    for registration in state.registration_repo.list_by_event(&event.id).await? {
        if !registration.status.holds_seat() {
            continue;
        }
        if let Some(job) = reminder_job(&registration, event, now) {
            state.job_repo.create(&job).await?;
            scheduled += 1;
        }
    }

    info!("Start of {} moved; {} reminders cancelled, {} scheduled", event.id, cancelled, scheduled);
    Ok(())
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    workflow::ensure_can_delete(&event, &user)?;

    let materials = state.material_repo.list_by_event(&event.id).await?;
    state.event_repo.delete(&event.id).await?;
    for material in materials {
        state.file_storage.delete(&material.storage_key).await?;
    }

    info!("Event deleted: {} by {}", event.id, user.id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_lecturers(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    ensure_visible(&state, &event, user.as_ref()).await?;

    let lecturers: Vec<PublicProfile> = state.event_repo.list_lecturers(&event.id).await?
        .iter()
        .map(PublicProfile::from)
        .collect();
    Ok(Json(lecturers))
}

pub async fn add_lecturer(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    Json(payload): Json<LecturerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    ensure_can_manage_lecturers(&event, &user)?;

    let lecturer = state.user_repo.find_by_id(&payload.user_id).await?
        .ok_or(AppError::NotFound("User not found".into()))?;
    if !lecturer.can_create_events() || !lecturer.is_active {
        return Err(AppError::Validation("Only active lecturers or staff can be assigned".into()));
    }
    if state.event_repo.is_lecturer(&event.id, &lecturer.id).await? {
        return Err(AppError::Conflict("User is already a lecturer of this event".into()));
    }

    state.event_repo.add_lecturer(&event.id, &lecturer.id).await?;
    info!("Lecturer {} added to event {}", lecturer.id, event.id);
    Ok((StatusCode::CREATED, Json(PublicProfile::from(&lecturer))))
}

pub async fn remove_lecturer(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((event_id, lecturer_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    ensure_can_manage_lecturers(&event, &user)?;

    if !state.event_repo.is_lecturer(&event.id, &lecturer_id).await? {
        return Err(AppError::NotFound("Lecturer not assigned to this event".into()));
    }
    state.event_repo.remove_lecturer(&event.id, &lecturer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn ensure_can_manage_lecturers(event: &Event, user: &User) -> Result<(), AppError> {
    if !(workflow::is_creator(event, user) || user.is_staff()) {
        return Err(AppError::Forbidden("Only the creator or staff can manage lecturers".into()));
    }
    if event.status == EventStatus::Cancelled {
        return Err(AppError::Conflict("Cancelled events cannot be changed".into()));
    }
    Ok(())
}

async fn validate_event(state: &AppState, event: &Event) -> Result<(), AppError> {
    if event.title.is_empty() || event.title.chars().count() > 200 {
        return Err(AppError::Validation("Title must be 1-200 characters".into()));
    }
    if event.location.is_empty() {
        return Err(AppError::Validation("Location is required".into()));
    }
    if event.end_time <= event.start_time {
        return Err(AppError::Validation("End time must be after start time".into()));
    }
    if event.capacity < 1 {
        return Err(AppError::Validation("Capacity must be at least 1".into()));
    }
    if event.timezone.parse::<Tz>().is_err() {
        return Err(AppError::Validation("Invalid timezone".into()));
    }
    if let Some(url) = &event.meeting_url {
        if reqwest::Url::parse(url).is_err() {
            return Err(AppError::Validation("Invalid meeting URL".into()));
        }
    }
    if let Some(category_id) = &event.category_id {
        if state.category_repo.find_by_id(category_id).await?.is_none() {
            return Err(AppError::Validation("Unknown category".into()));
        }
    }
    Ok(())
}
