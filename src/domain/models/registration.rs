use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use super::{random_token, UnknownVariant};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Registered,
    Waitlisted,
    Attended,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Registered => "REGISTERED",
            RegistrationStatus::Waitlisted => "WAITLISTED",
            RegistrationStatus::Attended => "ATTENDED",
        }
    }

    pub fn holds_seat(&self) -> bool {
        matches!(self, RegistrationStatus::Registered | RegistrationStatus::Attended)
    }
}

impl TryFrom<String> for RegistrationStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "REGISTERED" => Ok(RegistrationStatus::Registered),
            "WAITLISTED" => Ok(RegistrationStatus::Waitlisted),
            "ATTENDED" => Ok(RegistrationStatus::Attended),
            _ => Err(UnknownVariant { kind: "registration status", value }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Registration {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    #[sqlx(try_from = "String")]
    pub status: RegistrationStatus,
    pub qr_code: Option<String>,
    pub waitlist_position: Option<i32>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    /// A registration request before seat allocation; the repository decides
    /// whether it becomes REGISTERED or WAITLISTED.
    pub fn pending(event_id: String, user_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            event_id,
            user_id,
            status: RegistrationStatus::Waitlisted,
            qr_code: None,
            waitlist_position: None,
            checked_in_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Payload encoded into the attendee's check-in QR code.
pub fn new_qr_code() -> String {
    format!("EVH-{}", random_token(40))
}

/// Result of removing a registration from an event.
#[derive(Debug, Clone)]
pub struct CancellationOutcome {
    pub cancelled: Registration,
    pub promoted: Option<Registration>,
}

/// Registration joined with the attendee's identity, for organizer views.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Attendee {
    pub registration_id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub status: RegistrationStatus,
    pub waitlist_position: Option<i32>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Registration joined with an event summary, for the attendee's own list.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct UserRegistration {
    pub id: String,
    pub event_id: String,
    pub event_title: String,
    pub event_start_time: DateTime<Utc>,
    pub event_end_time: DateTime<Utc>,
    pub event_location: String,
    #[sqlx(try_from = "String")]
    pub status: RegistrationStatus,
    pub qr_code: Option<String>,
    pub waitlist_position: Option<i32>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
