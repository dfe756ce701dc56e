use crate::domain::{models::category::EventCategory, ports::CategoryRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresCategoryRepo {
    pool: PgPool,
}

impl PostgresCategoryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepo {
    async fn create(&self, category: &EventCategory) -> Result<EventCategory, AppError> {
        sqlx::query_as::<_, EventCategory>(
            "INSERT INTO event_categories (id, name, description, created_at) VALUES ($1, $2, $3, $4) RETURNING *"
        )
            .bind(&category.id)
            .bind(&category.name)
            .bind(&category.description)
            .bind(category.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<EventCategory>, AppError> {
        sqlx::query_as::<_, EventCategory>("SELECT * FROM event_categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<EventCategory>, AppError> {
        sqlx::query_as::<_, EventCategory>("SELECT * FROM event_categories ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update(&self, category: &EventCategory) -> Result<EventCategory, AppError> {
        sqlx::query_as::<_, EventCategory>(
            "UPDATE event_categories SET name = $1, description = $2 WHERE id = $3 RETURNING *"
        )
            .bind(&category.name)
            .bind(&category.description)
            .bind(&category.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Category not found".into()))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM event_categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Category not found".into()));
        }
        Ok(())
    }
}
