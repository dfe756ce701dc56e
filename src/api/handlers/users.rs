use axum::{extract::{State, Path, Query}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AuthUser;
use crate::api::dtos::requests::{SetRoleRequest, SetStatusRequest, UserListQuery};
use crate::domain::models::user::User;
use crate::error::AppError;
use std::sync::Arc;
use chrono::Utc;
use tracing::info;

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AuthUser(admin): AuthUser,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse, AppError> {
    ensure_staff(&admin)?;
    let users = state.user_repo.list(query.role).await?;
    Ok(Json(users))
}

pub async fn set_role(
    State(state): State<Arc<AppState>>,
    AuthUser(admin): AuthUser,
    Path(user_id): Path<String>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut user = load_other_user(&state, &admin, &user_id).await?;

    user.role = payload.role;
    user.updated_at = Utc::now();
    let updated = state.user_repo.update(&user).await?;

    info!("User {} set role of {} to {}", admin.id, updated.id, updated.role.as_str());
    Ok(Json(updated))
}

pub async fn set_status(
    State(state): State<Arc<AppState>>,
    AuthUser(admin): AuthUser,
    Path(user_id): Path<String>,
    Json(payload): Json<SetStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut user = load_other_user(&state, &admin, &user_id).await?;

    user.is_active = payload.is_active;
    user.updated_at = Utc::now();
    let updated = state.user_repo.update(&user).await?;

    if !updated.is_active {
        state.auth_service.revoke_sessions(&updated.id).await?;
    }

    info!("User {} set active={} for {}", admin.id, updated.is_active, updated.id);
    Ok(Json(updated))
}

fn ensure_staff(user: &User) -> Result<(), AppError> {
    if !user.is_staff() {
        return Err(AppError::Forbidden("Staff only".into()));
    }
    Ok(())
}

async fn load_other_user(state: &AppState, admin: &User, user_id: &str) -> Result<User, AppError> {
    ensure_staff(admin)?;
    if admin.id == user_id {
        return Err(AppError::Conflict("You cannot change your own role or status".into()));
    }
    state.user_repo.find_by_id(user_id).await?
        .ok_or(AppError::NotFound("User not found".into()))
}
