use crate::domain::models::communication::MailLog;
use crate::domain::ports::CommunicationRepository;
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteCommunicationRepo {
    pool: SqlitePool,
}

impl SqliteCommunicationRepo {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }
}

#[async_trait]
impl CommunicationRepository for SqliteCommunicationRepo {
    async fn log_mail(&self, log: &MailLog) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO mail_logs (id, job_id, recipient, template_id, context_hash, sent_at, status)
             VALUES (?, ?, ?, ?, ?, ?, ?)"
        )
            .bind(&log.id).bind(&log.job_id).bind(&log.recipient).bind(&log.template_id)
            .bind(&log.context_hash).bind(log.sent_at).bind(&log.status)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn has_mail_been_sent(&self, recipient: &str, template_id: &str, context_hash: &str) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM mail_logs WHERE recipient = ? AND template_id = ? AND context_hash = ? AND status = 'SENT')"
        )
            .bind(recipient).bind(template_id).bind(context_hash)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_logs(&self, recipient: Option<&str>) -> Result<Vec<MailLog>, AppError> {
        sqlx::query_as::<_, MailLog>(
            "SELECT * FROM mail_logs WHERE (?1 IS NULL OR recipient = ?1) ORDER BY sent_at DESC LIMIT 200"
        )
            .bind(recipient)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}
