use axum::{extract::{State, Path, Multipart}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AuthUser;
use crate::api::dtos::{
    requests::{ChangePasswordRequest, UpdateProfileRequest},
    responses::MessageResponse,
};
use crate::domain::models::user::PublicProfile;
use crate::domain::services::auth_service::{hash_password, verify_password};
use crate::error::AppError;
use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;
use tracing::info;

const AVATAR_MAX_BYTES: usize = 2 * 1024 * 1024;

pub async fn get_me(AuthUser(user): AuthUser) -> Result<impl IntoResponse, AppError> {
    Ok(Json(user))
}

pub async fn update_me(
    State(state): State<Arc<AppState>>,
    AuthUser(mut user): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Name cannot be empty".into()));
        }
        user.name = name;
    }
    if let Some(val) = payload.title { user.title = non_empty(val); }
    if let Some(val) = payload.institution { user.institution = non_empty(val); }
    if let Some(val) = payload.department { user.department = non_empty(val); }
    if let Some(val) = payload.bio { user.bio = non_empty(val); }
    user.updated_at = Utc::now();

    let updated = state.user_repo.update(&user).await?;
    Ok(Json(updated))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(mut user): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !verify_password(&payload.current_password, &user.password_hash)? {
        return Err(AppError::Validation("Current password is incorrect".into()));
    }
    user.password_hash = hash_password(&payload.new_password)?;
    user.updated_at = Utc::now();
    state.user_repo.update(&user).await?;

    info!("Password changed for user: {}", user.id);
    Ok(Json(MessageResponse::new("Password updated")))
}

pub async fn upload_avatar(
    State(state): State<Arc<AppState>>,
    AuthUser(mut user): AuthUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;
        upload = Some((content_type, data));
        break;
    }

    let (content_type, data) = upload.ok_or(AppError::Validation("Missing 'file' field".into()))?;
    let extension = match content_type.as_str() {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => return Err(AppError::Validation("Avatar must be a PNG, JPEG, GIF or WebP image".into())),
    };
    if data.is_empty() || data.len() > AVATAR_MAX_BYTES {
        return Err(AppError::Validation("Avatar must be between 1 byte and 2 MiB".into()));
    }

    let key = format!("avatars/{}-{}.{}", user.id, Uuid::new_v4(), extension);
    state.file_storage.save(&key, &data).await?;

    let previous = user.avatar_url.replace(state.file_storage.public_url(&key));
    user.updated_at = Utc::now();
    let updated = state.user_repo.update(&user).await?;

    if let Some(old_key) = previous.as_deref().and_then(|url| url.find("avatars/").map(|i| &url[i..])) {
        state.file_storage.delete(old_key).await?;
    }

    info!("Avatar updated for user: {}", updated.id);
    Ok(Json(updated))
}

pub async fn my_registrations(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let registrations = state.registration_repo.list_by_user(&user.id).await?;
    Ok(Json(registrations))
}

pub async fn my_events(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let events = state.event_repo.list_for_organizer(&user.id).await?;
    Ok(Json(events))
}

pub async fn my_reviews(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    if !user.is_staff() {
        return Err(AppError::Forbidden("Only staff review events".into()));
    }
    let events = state.event_repo.list_pending_review(&user.id).await?;
    Ok(Json(events))
}

pub async fn public_profile(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_repo.find_by_id(&user_id).await?
        .filter(|u| u.is_active)
        .ok_or(AppError::NotFound("User not found".into()))?;
    Ok(Json(PublicProfile::from(&user)))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
