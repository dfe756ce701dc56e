use axum::{
    extract::{State, Path, Multipart},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use crate::state::AppState;
use crate::api::extractors::auth::AuthUser;
use crate::api::handlers::access::{ensure_organizer_or_staff, ensure_participant, load_event};
use crate::domain::models::{event::EventStatus, material::EventMaterial};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

pub async fn upload_material(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    ensure_organizer_or_staff(&state, &event, &user).await?;
    if event.status == EventStatus::Cancelled {
        return Err(AppError::Conflict("Cancelled events cannot receive materials".into()));
    }

    let mut upload = None;
    while let Some(field) = multipart.next_field().await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name()
            .filter(|n| !n.trim().is_empty())
            .ok_or(AppError::Validation("Upload needs a file name".into()))?
            .to_string();
        let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
        let data = field.bytes().await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;
        upload = Some((file_name, content_type, data));
        break;
    }

    let (file_name, content_type, data) = upload.ok_or(AppError::Validation("Missing 'file' field".into()))?;
    if data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".into()));
    }
    if data.len() > state.config.max_upload_bytes {
        return Err(AppError::Validation(format!(
            "File exceeds the limit of {} bytes",
            state.config.max_upload_bytes
        )));
    }

    let material = EventMaterial::new(event.id.clone(), file_name, content_type, data.len() as i64, user.id.clone());
    state.file_storage.save(&material.storage_key, &data).await?;

    let created = match state.material_repo.create(&material).await {
        Ok(created) => created,
        Err(e) => {
            state.file_storage.delete(&material.storage_key).await?;
            return Err(e);
        }
    };

    info!("Material {} uploaded to {} by {}", created.id, event.id, user.id);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_materials(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    ensure_participant(&state, &event, &user).await?;

    let materials = state.material_repo.list_by_event(&event.id).await?;
    Ok(Json(materials))
}

pub async fn download_material(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((event_id, material_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    ensure_participant(&state, &event, &user).await?;

    let material = state.material_repo.find_by_id(&material_id).await?
        .filter(|m| m.event_id == event.id)
        .ok_or(AppError::NotFound("Material not found".into()))?;

    let data = state.file_storage.load(&material.storage_key).await?;
    let disposition = format!("attachment; filename=\"{}\"", material.file_name.replace(['"', '\\', '\r', '\n'], "_"));

    Ok((
        [
            (header::CONTENT_TYPE, material.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    ))
}

pub async fn delete_material(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((event_id, material_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let material = state.material_repo.find_by_id(&material_id).await?
        .filter(|m| m.event_id == event_id)
        .ok_or(AppError::NotFound("Material not found".into()))?;

    if material.uploaded_by != user.id && !user.is_staff() {
        return Err(AppError::Forbidden("Only the uploader or staff can delete this material".into()));
    }

    state.material_repo.delete(&material.id).await?;
    state.file_storage.delete(&material.storage_key).await?;

    info!("Material {} deleted by {}", material.id, user.id);
    Ok(StatusCode::NO_CONTENT)
}
