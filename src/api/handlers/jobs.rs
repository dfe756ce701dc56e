use axum::{extract::{State, Query}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AuthUser;
use crate::api::dtos::requests::{JobListQuery, MailLogQuery};
use crate::error::AppError;
use std::sync::Arc;

pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<JobListQuery>,
) -> Result<impl IntoResponse, AppError> {
    if !user.is_staff() {
        return Err(AppError::Forbidden("Staff only".into()));
    }
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let jobs = state.job_repo.list_recent(limit).await?;
    Ok(Json(jobs))
}

pub async fn list_mail_logs(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<MailLogQuery>,
) -> Result<impl IntoResponse, AppError> {
    if !user.is_staff() {
        return Err(AppError::Forbidden("Staff only".into()));
    }
    let logs = state.communication_repo.list_logs(query.recipient.as_deref()).await?;
    Ok(Json(logs))
}
