use crate::domain::{
    models::{
        event::RegistrationCounts,
        registration::{new_qr_code, Attendee, CancellationOutcome, Registration, RegistrationStatus, UserRegistration},
    },
    ports::RegistrationRepository,
    services::waitlist::{next_waitlist_position, plan_cancellation, plan_capacity_change, WaitlistPlan},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

/// Every write transaction here starts with a write statement, so SQLite's
/// database-level write lock serializes seat and waitlist changes.
pub struct SqliteRegistrationRepo {
    pool: SqlitePool,
}

impl SqliteRegistrationRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

async fn load_waitlist(conn: &mut SqliteConnection, event_id: &str) -> Result<Vec<Registration>, AppError> {
    sqlx::query_as::<_, Registration>(
        "SELECT * FROM registrations WHERE event_id = ? AND status = 'WAITLISTED' ORDER BY waitlist_position ASC, created_at ASC"
    )
        .bind(event_id)
        .fetch_all(conn)
        .await
        .map_err(AppError::Database)
}

async fn apply_waitlist_plan(conn: &mut SqliteConnection, plan: &WaitlistPlan) -> Result<Vec<Registration>, AppError> {
    let now = Utc::now();
    let mut promoted = Vec::with_capacity(plan.promotions.len());

    for promotion in &plan.promotions {
        let row = sqlx::query_as::<_, Registration>(
            "UPDATE registrations SET status = 'REGISTERED', qr_code = ?, waitlist_position = NULL, updated_at = ?
             WHERE id = ? RETURNING *"
        )
            .bind(&promotion.qr_code)
            .bind(now)
            .bind(&promotion.registration_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(AppError::Database)?;
        promoted.push(row);
    }

    for (id, position) in &plan.renumbered {
        sqlx::query("UPDATE registrations SET waitlist_position = ?, updated_at = ? WHERE id = ?")
            .bind(position)
            .bind(now)
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(AppError::Database)?;
    }

    Ok(promoted)
}

#[async_trait]
impl RegistrationRepository for SqliteRegistrationRepo {
    async fn register(&self, registration: &Registration) -> Result<Registration, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let now = Utc::now();

        let claimed = sqlx::query(
            "UPDATE events SET available_seats = available_seats - 1, updated_at = ? WHERE id = ? AND available_seats > 0"
        )
            .bind(now)
            .bind(&registration.event_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .rows_affected() == 1;

        let (status, qr_code, position) = if claimed {
            (RegistrationStatus::Registered, Some(new_qr_code()), None)
        } else {
            let last: Option<i64> = sqlx::query_scalar(
                "SELECT MAX(waitlist_position) FROM registrations WHERE event_id = ? AND status = 'WAITLISTED'"
            )
                .bind(&registration.event_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(AppError::Database)?;
            (RegistrationStatus::Waitlisted, None, Some(next_waitlist_position(last.map(|p| p as i32))))
        };

        let created = sqlx::query_as::<_, Registration>(
            "INSERT INTO registrations (id, event_id, user_id, status, qr_code, waitlist_position, checked_in_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, NULL, ?, ?)
             RETURNING *"
        )
            .bind(&registration.id)
            .bind(&registration.event_id)
            .bind(&registration.user_id)
            .bind(status.as_str())
            .bind(qr_code)
            .bind(position)
            .bind(registration.created_at)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        debug!("Registration {} stored as {}", created.id, created.status.as_str());
        Ok(created)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Registration>, AppError> {
        sqlx::query_as::<_, Registration>("SELECT * FROM registrations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_for_user(&self, event_id: &str, user_id: &str) -> Result<Option<Registration>, AppError> {
        sqlx::query_as::<_, Registration>("SELECT * FROM registrations WHERE event_id = ? AND user_id = ?")
            .bind(event_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_qr_code(&self, event_id: &str, qr_code: &str) -> Result<Option<Registration>, AppError> {
        sqlx::query_as::<_, Registration>("SELECT * FROM registrations WHERE event_id = ? AND qr_code = ?")
            .bind(event_id)
            .bind(qr_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Registration>, AppError> {
        sqlx::query_as::<_, Registration>("SELECT * FROM registrations WHERE event_id = ? ORDER BY created_at ASC")
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_attendees(&self, event_id: &str) -> Result<Vec<Attendee>, AppError> {
        sqlx::query_as::<_, Attendee>(
            r#"SELECT r.id AS registration_id, r.user_id, u.name, u.email, r.status,
                      r.waitlist_position, r.checked_in_at, r.created_at
               FROM registrations r
               JOIN users u ON u.id = r.user_id
               WHERE r.event_id = ?
               ORDER BY CASE r.status WHEN 'WAITLISTED' THEN 1 ELSE 0 END, r.waitlist_position ASC, r.created_at ASC"#
        )
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<UserRegistration>, AppError> {
        sqlx::query_as::<_, UserRegistration>(
            r#"SELECT r.id, r.event_id, e.title AS event_title, e.start_time AS event_start_time,
                      e.end_time AS event_end_time, e.location AS event_location, r.status, r.qr_code,
                      r.waitlist_position, r.checked_in_at, r.created_at
               FROM registrations r
               JOIN events e ON e.id = r.event_id
               WHERE r.user_id = ?
               ORDER BY e.start_time ASC"#
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn counts(&self, event_id: &str) -> Result<RegistrationCounts, AppError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM registrations WHERE event_id = ? GROUP BY status"
        )
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        let mut counts = RegistrationCounts::default();
        for (status, count) in rows {
            match status.as_str() {
                "REGISTERED" => counts.registered = count,
                "WAITLISTED" => counts.waitlisted = count,
                "ATTENDED" => counts.attended = count,
                _ => {}
            }
        }
        Ok(counts)
    }

    async fn cancel(&self, registration: &Registration) -> Result<CancellationOutcome, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let removed = sqlx::query_as::<_, Registration>("DELETE FROM registrations WHERE id = ? RETURNING *")
            .bind(&registration.id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Registration not found".into()))?;

        let waitlist = load_waitlist(&mut *tx, &removed.event_id).await?;
        // Attended rows are rejected here and the delete is rolled back with the transaction.
        let plan = plan_cancellation(&removed, &waitlist)?;
        let promoted = apply_waitlist_plan(&mut *tx, &plan.waitlist).await?;

        if plan.seat_delta != 0 {
            sqlx::query("UPDATE events SET available_seats = available_seats + ?, updated_at = ? WHERE id = ?")
                .bind(plan.seat_delta)
                .bind(Utc::now())
                .bind(&removed.event_id)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(CancellationOutcome { cancelled: removed, promoted: promoted.into_iter().next() })
    }

    async fn mark_attended(&self, id: &str) -> Result<Option<Registration>, AppError> {
        let now = Utc::now();
        sqlx::query_as::<_, Registration>(
            "UPDATE registrations SET status = 'ATTENDED', checked_in_at = ?, updated_at = ?
             WHERE id = ? AND status = 'REGISTERED' RETURNING *"
        )
            .bind(now)
            .bind(now)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn resize_capacity(&self, event_id: &str, capacity: i32) -> Result<Vec<Registration>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let now = Utc::now();

        let touched = sqlx::query("UPDATE events SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(event_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .rows_affected();
        if touched == 0 {
            return Err(AppError::NotFound("Event not found".into()));
        }

        let seated: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM registrations WHERE event_id = ? AND status IN ('REGISTERED', 'ATTENDED')"
        )
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let waitlist = load_waitlist(&mut *tx, event_id).await?;
        let plan = plan_capacity_change(capacity, seated, &waitlist)?;

        sqlx::query("UPDATE events SET capacity = ?, available_seats = ? WHERE id = ?")
            .bind(capacity)
            .bind(plan.available_seats)
            .bind(event_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let promoted = apply_waitlist_plan(&mut *tx, &plan.waitlist).await?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(promoted)
    }
}
