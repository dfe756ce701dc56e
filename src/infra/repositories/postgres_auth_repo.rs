use crate::domain::{
    models::auth::{RefreshTokenRecord, TokenPurpose, VerificationToken},
    ports::AuthRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PostgresAuthRepo { pool: PgPool }
impl PostgresAuthRepo { pub fn new(pool: PgPool) -> Self { Self { pool } } }

#[async_trait]
impl AuthRepository for PostgresAuthRepo {
    async fn create_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (token_hash, user_id, family_id, generation_id, expires_at, created_at) VALUES ($1, $2, $3, $4, $5, $6)"
        )
            .bind(&record.token_hash)
            .bind(&record.user_id)
            .bind(record.family_id)
            .bind(record.generation_id)
            .bind(record.expires_at)
            .bind(record.created_at)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT token_hash, user_id, family_id, generation_id, expires_at, created_at
             FROM refresh_tokens WHERE token_hash = $1"
        )
            .bind(token_hash)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn delete_refresh_token(&self, token_hash: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn delete_refresh_family(&self, family_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE family_id = $1")
            .bind(family_id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn delete_refresh_tokens_for_user(&self, user_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn create_verification_token(&self, token: &VerificationToken) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO verification_tokens (token_hash, user_id, purpose, expires_at, created_at) VALUES ($1, $2, $3, $4, $5)"
        )
            .bind(&token.token_hash)
            .bind(&token.user_id)
            .bind(token.purpose.as_str())
            .bind(token.expires_at)
            .bind(token.created_at)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn consume_verification_token(&self, token_hash: &str, purpose: TokenPurpose) -> Result<Option<VerificationToken>, AppError> {
        sqlx::query_as::<_, VerificationToken>(
            "DELETE FROM verification_tokens WHERE token_hash = $1 AND purpose = $2
             RETURNING token_hash, user_id, purpose, expires_at, created_at"
        )
            .bind(token_hash)
            .bind(purpose.as_str())
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn delete_verification_tokens(&self, user_id: &str, purpose: TokenPurpose) -> Result<(), AppError> {
        sqlx::query("DELETE FROM verification_tokens WHERE user_id = $1 AND purpose = $2")
            .bind(user_id)
            .bind(purpose.as_str())
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }
}
