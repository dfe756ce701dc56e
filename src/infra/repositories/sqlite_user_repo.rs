use crate::domain::{models::user::{Role, User}, ports::UserRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::error;

const USER_COLUMNS: &str = "id, email, password_hash, name, role, is_active, email_verified, title, institution, department, bio, avatar_url, created_at, updated_at";

pub struct SqliteUserRepo {
    pool: SqlitePool,
}

impl SqliteUserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepo {
    async fn create(&self, user: &User) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
        ))
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .bind(user.role.as_str())
            .bind(user.is_active)
            .bind(user.email_verified)
            .bind(&user.title)
            .bind(&user.institution)
            .bind(&user.department)
            .bind(&user.bio)
            .bind(&user.avatar_url)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("SQLite user insert failed: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self, role: Option<Role>) -> Result<Vec<User>, AppError> {
        let users = match role {
            Some(role) => sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE role = ? ORDER BY name ASC"
            ))
                .bind(role.as_str())
                .fetch_all(&self.pool)
                .await,
            None => sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY name ASC"))
                .fetch_all(&self.pool)
                .await,
        };
        users.map_err(AppError::Database)
    }

    async fn update(&self, user: &User) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET email = ?, password_hash = ?, name = ?, role = ?, is_active = ?, email_verified = ?,
                title = ?, institution = ?, department = ?, bio = ?, avatar_url = ?, updated_at = ?
             WHERE id = ? RETURNING {USER_COLUMNS}"
        ))
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .bind(user.role.as_str())
            .bind(user.is_active)
            .bind(user.email_verified)
            .bind(&user.title)
            .bind(&user.institution)
            .bind(&user.department)
            .bind(&user.bio)
            .bind(&user.avatar_url)
            .bind(user.updated_at)
            .bind(&user.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.id)))
    }
}
