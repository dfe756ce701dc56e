use axum::{extract::{State, Path}, http::header, response::IntoResponse};
use crate::state::AppState;
use crate::error::AppError;
use std::sync::Arc;

/// Public file route. Only avatars are served here; materials go through
/// the access-checked event endpoints.
pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !key.starts_with("avatars/") {
        return Err(AppError::NotFound("File not found".into()));
    }
    let data = state.file_storage.load(&key).await?;

    let content_type = match key.rsplit('.').next() {
        Some("png") => "image/png",
        Some("jpg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        data,
    ))
}
