use std::sync::Arc;
use crate::domain::{
    models::communication::MailLog,
    ports::CommunicationRepository,
};
use crate::error::AppError;
use sha2::{Sha256, Digest};
use uuid::Uuid;
use chrono::Utc;
use serde_json::Value;
use tracing::info;

/// Delivery ledger. A mail is identified by recipient, template and a hash of
/// its rendering context, so a retried job never sends the same mail twice.
pub struct CommunicationService {
    repo: Arc<dyn CommunicationRepository>,
}

impl CommunicationService {
    pub fn new(repo: Arc<dyn CommunicationRepository>) -> Self {
        Self { repo }
    }

    /// Returns `true` (and logs the skip) when this exact mail was already delivered.
    pub async fn skip_if_sent(&self, job_id: &str, recipient: &str, template_name: &str, context_data: &Value) -> Result<bool, AppError> {
        let hash = context_hash(template_name, context_data);
        if !self.repo.has_mail_been_sent(recipient, template_name, &hash).await? {
            return Ok(false);
        }

        info!("Email skipped (idempotency) for job {}. Recipient: {}, Template: {}", job_id, recipient, template_name);
        self.log(job_id, recipient, template_name, hash, "SKIPPED_DUPLICATE").await?;
        Ok(true)
    }

    pub async fn record_success(&self, job_id: &str, recipient: &str, template_name: &str, context_data: &Value) -> Result<(), AppError> {
        info!("Recording success in ledger for: {} (Template: {})", recipient, template_name);
        let hash = context_hash(template_name, context_data);
        self.log(job_id, recipient, template_name, hash, "SENT").await
    }

    async fn log(&self, job_id: &str, recipient: &str, template_name: &str, hash: String, status: &str) -> Result<(), AppError> {
        let log = MailLog {
            id: Uuid::new_v4().to_string(),
            job_id: job_id.to_string(),
            recipient: recipient.to_string(),
            template_id: template_name.to_string(),
            context_hash: hash,
            sent_at: Utc::now(),
            status: status.to_string(),
        };
        self.repo.log_mail(&log).await
    }
}

pub fn context_hash(template_name: &str, context_data: &Value) -> String {
    let context_json = serde_json::to_string(context_data).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(template_name.as_bytes());
    hasher.update(context_json.as_bytes());
    hex::encode(hasher.finalize())
}
