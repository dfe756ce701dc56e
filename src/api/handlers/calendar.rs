use axum::{extract::{State, Path}, http::header, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::maybe_auth::MaybeAuthUser;
use crate::api::handlers::access::{ensure_visible, load_event};
use crate::domain::services::calendar::{calendar_links, generate_ics};
use crate::error::AppError;
use std::sync::Arc;

pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    ensure_visible(&state, &event, user.as_ref()).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"event-{}.ics\"", event.id)),
        ],
        generate_ics(&event),
    ))
}

pub async fn get_calendar_links(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    ensure_visible(&state, &event, user.as_ref()).await?;

    Ok(Json(calendar_links(&event, &state.config.public_url)?))
}
