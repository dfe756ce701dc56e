use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Delivery ledger entry; `(recipient, template_id, context_hash)` identifies a mail.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct MailLog {
    pub id: String,
    pub job_id: String,
    pub recipient: String,
    pub template_id: String,
    pub context_hash: String,
    pub sent_at: DateTime<Utc>,
    pub status: String,
}

/// A rendered email ready for delivery.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
    pub attachment_name: Option<String>,
    pub attachment_data: Option<Vec<u8>>,
}
