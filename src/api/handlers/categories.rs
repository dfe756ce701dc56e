use axum::{extract::{State, Path}, response::IntoResponse, Json, http::StatusCode};
use crate::state::AppState;
use crate::api::extractors::auth::AuthUser;
use crate::api::dtos::requests::CategoryRequest;
use crate::domain::models::{category::EventCategory, user::User};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let categories = state.category_repo.list().await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    ensure_staff(&user)?;
    let category = EventCategory::new(validate_name(&payload.name)?, payload.description);
    let created = state.category_repo.create(&category).await?;

    info!("Category created: {}", created.name);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_category(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(category_id): Path<String>,
    Json(payload): Json<CategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    ensure_staff(&user)?;
    let mut category = state.category_repo.find_by_id(&category_id).await?
        .ok_or(AppError::NotFound("Category not found".into()))?;

    category.name = validate_name(&payload.name)?;
    category.description = payload.description;
    let updated = state.category_repo.update(&category).await?;
    Ok(Json(updated))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(category_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    ensure_staff(&user)?;
    state.category_repo.find_by_id(&category_id).await?
        .ok_or(AppError::NotFound("Category not found".into()))?;

    state.category_repo.delete(&category_id).await?;
    info!("Category deleted: {}", category_id);
    Ok(StatusCode::NO_CONTENT)
}

fn ensure_staff(user: &User) -> Result<(), AppError> {
    if !user.is_staff() {
        return Err(AppError::Forbidden("Only staff can manage categories".into()));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 100 {
        return Err(AppError::Validation("Category name must be 1-100 characters".into()));
    }
    Ok(name.to_string())
}
