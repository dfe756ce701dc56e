use crate::domain::{
    models::{event::{Event, EventFilter}, user::User},
    ports::EventRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

pub struct PostgresEventRepo {
    pool: PgPool,
}

impl PostgresEventRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepo {
    async fn create(&self, event: &Event) -> Result<Event, AppError> {
        sqlx::query_as::<_, Event>(
            r#"INSERT INTO events (
                id, title, description, category_id, location, meeting_url, timezone,
                start_time, end_time, capacity, available_seats, status, image_url,
                created_by, reviewer_id, review_comment, submitted_at, reviewed_at, published_at,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            RETURNING *"#
        )
            .bind(&event.id)
            .bind(&event.title)
            .bind(&event.description)
            .bind(&event.category_id)
            .bind(&event.location)
            .bind(&event.meeting_url)
            .bind(&event.timezone)
            .bind(event.start_time)
            .bind(event.end_time)
            .bind(event.capacity)
            .bind(event.available_seats)
            .bind(event.status.as_str())
            .bind(&event.image_url)
            .bind(&event.created_by)
            .bind(&event.reviewer_id)
            .bind(&event.review_comment)
            .bind(event.submitted_at)
            .bind(event.reviewed_at)
            .bind(event.published_at)
            .bind(event.created_at)
            .bind(event.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, AppError> {
        let pattern = filter.q.as_ref().map(|q| format!("%{}%", q.trim()));
        sqlx::query_as::<_, Event>(
            r#"SELECT * FROM events
               WHERE ($1::text IS NULL OR status = $1)
                 AND ($2::text IS NULL OR category_id = $2)
                 AND ($3::text IS NULL OR title ILIKE $3 OR description ILIKE $3)
                 AND (NOT $4 OR end_time > $5)
               ORDER BY start_time ASC"#
        )
            .bind(filter.status.map(|s| s.as_str()))
            .bind(&filter.category_id)
            .bind(pattern)
            .bind(filter.upcoming)
            .bind(Utc::now())
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_for_organizer(&self, user_id: &str) -> Result<Vec<Event>, AppError> {
        sqlx::query_as::<_, Event>(
            r#"SELECT * FROM events
               WHERE created_by = $1
                  OR id IN (SELECT event_id FROM event_lecturers WHERE user_id = $1)
               ORDER BY start_time ASC"#
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_pending_review(&self, reviewer_id: &str) -> Result<Vec<Event>, AppError> {
        sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE reviewer_id = $1 AND status = 'PENDING_REVIEW' ORDER BY submitted_at ASC"
        )
            .bind(reviewer_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update(&self, event: &Event) -> Result<Event, AppError> {
        sqlx::query_as::<_, Event>(
            r#"UPDATE events SET
                title = $1, description = $2, category_id = $3, location = $4, meeting_url = $5, timezone = $6,
                start_time = $7, end_time = $8, status = $9, image_url = $10, reviewer_id = $11, review_comment = $12,
                submitted_at = $13, reviewed_at = $14, published_at = $15, updated_at = $16
               WHERE id = $17
               RETURNING *"#
        )
            .bind(&event.title)
            .bind(&event.description)
            .bind(&event.category_id)
            .bind(&event.location)
            .bind(&event.meeting_url)
            .bind(&event.timezone)
            .bind(event.start_time)
            .bind(event.end_time)
            .bind(event.status.as_str())
            .bind(&event.image_url)
            .bind(&event.reviewer_id)
            .bind(&event.review_comment)
            .bind(event.submitted_at)
            .bind(event.reviewed_at)
            .bind(event.published_at)
            .bind(event.updated_at)
            .bind(&event.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Event not found".into()))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Event not found".into()));
        }
        Ok(())
    }

    async fn add_lecturer(&self, event_id: &str, user_id: &str) -> Result<(), AppError> {
        sqlx::query("INSERT INTO event_lecturers (event_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(event_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn remove_lecturer(&self, event_id: &str, user_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM event_lecturers WHERE event_id = $1 AND user_id = $2")
            .bind(event_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Lecturer is not assigned to this event".into()));
        }
        Ok(())
    }

    async fn list_lecturers(&self, event_id: &str) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, User>(
            r#"SELECT u.* FROM users u
               JOIN event_lecturers el ON el.user_id = u.id
               WHERE el.event_id = $1
               ORDER BY u.name ASC"#
        )
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn is_lecturer(&self, event_id: &str, user_id: &str) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM event_lecturers WHERE event_id = $1 AND user_id = $2)"
        )
            .bind(event_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
