use crate::domain::{models::material::EventMaterial, ports::MaterialRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteMaterialRepo {
    pool: SqlitePool,
}

impl SqliteMaterialRepo {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }
}

#[async_trait]
impl MaterialRepository for SqliteMaterialRepo {
    async fn create(&self, material: &EventMaterial) -> Result<EventMaterial, AppError> {
        sqlx::query_as::<_, EventMaterial>(
            "INSERT INTO event_materials (id, event_id, file_name, storage_key, content_type, size_bytes, uploaded_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING *"
        )
            .bind(&material.id).bind(&material.event_id).bind(&material.file_name).bind(&material.storage_key)
            .bind(&material.content_type).bind(material.size_bytes).bind(&material.uploaded_by).bind(material.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<EventMaterial>, AppError> {
        sqlx::query_as::<_, EventMaterial>("SELECT * FROM event_materials WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<EventMaterial>, AppError> {
        sqlx::query_as::<_, EventMaterial>("SELECT * FROM event_materials WHERE event_id = ? ORDER BY created_at ASC")
            .bind(event_id)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM event_materials WHERE id = ?")
            .bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 { return Err(AppError::NotFound("Material not found".into())); }
        Ok(())
    }
}
