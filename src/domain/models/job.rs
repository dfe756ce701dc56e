use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

pub const REGISTRATION_CONFIRMED: &str = "REGISTRATION_CONFIRMED";
pub const WAITLISTED: &str = "WAITLISTED";
pub const WAITLIST_PROMOTED: &str = "WAITLIST_PROMOTED";
pub const EVENT_REMINDER: &str = "EVENT_REMINDER";
pub const EVENT_CANCELLED: &str = "EVENT_CANCELLED";
pub const REVIEW_REQUESTED: &str = "REVIEW_REQUESTED";
pub const REVIEW_DECISION: &str = "REVIEW_DECISION";
pub const VERIFY_EMAIL: &str = "VERIFY_EMAIL";
pub const PASSWORD_RESET: &str = "PASSWORD_RESET";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct JobPayload {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Job {
    pub id: String,
    pub job_type: String,
    pub payload: Json<JobPayload>,
    pub execute_at: DateTime<Utc>,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(job_type: &str, payload: JobPayload, execute_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            job_type: job_type.to_string(),
            payload: Json(payload),
            execute_at,
            status: "PENDING".to_string(),
            error_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn for_user(job_type: &str, user_id: &str) -> Self {
        Self::new(job_type, JobPayload { user_id: user_id.to_string(), ..Default::default() }, Utc::now())
    }

    pub fn for_event(job_type: &str, user_id: &str, event_id: &str) -> Self {
        Self::new(
            job_type,
            JobPayload {
                user_id: user_id.to_string(),
                event_id: Some(event_id.to_string()),
                ..Default::default()
            },
            Utc::now(),
        )
    }

    pub fn for_registration(job_type: &str, user_id: &str, event_id: &str, registration_id: &str, execute_at: DateTime<Utc>) -> Self {
        Self::new(
            job_type,
            JobPayload {
                user_id: user_id.to_string(),
                event_id: Some(event_id.to_string()),
                registration_id: Some(registration_id.to_string()),
                token: None,
            },
            execute_at,
        )
    }

    pub fn with_token(job_type: &str, user_id: &str, token: String) -> Self {
        Self::new(
            job_type,
            JobPayload {
                user_id: user_id.to_string(),
                token: Some(token),
                ..Default::default()
            },
            Utc::now(),
        )
    }
}
