use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use super::{user::PublicProfile, category::EventCategory, UnknownVariant};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Draft,
    PendingReview,
    Approved,
    Published,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "DRAFT",
            EventStatus::PendingReview => "PENDING_REVIEW",
            EventStatus::Approved => "APPROVED",
            EventStatus::Published => "PUBLISHED",
            EventStatus::Cancelled => "CANCELLED",
        }
    }
}

impl TryFrom<String> for EventStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "DRAFT" => Ok(EventStatus::Draft),
            "PENDING_REVIEW" => Ok(EventStatus::PendingReview),
            "APPROVED" => Ok(EventStatus::Approved),
            "PUBLISHED" => Ok(EventStatus::Published),
            "CANCELLED" => Ok(EventStatus::Cancelled),
            _ => Err(UnknownVariant { kind: "event status", value }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category_id: Option<String>,
    pub location: String,
    pub meeting_url: Option<String>,
    pub timezone: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub available_seats: i32,
    #[sqlx(try_from = "String")]
    pub status: EventStatus,
    pub image_url: Option<String>,
    pub created_by: String,
    pub reviewer_id: Option<String>,
    pub review_comment: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewEventParams {
    pub title: String,
    pub description: String,
    pub category_id: Option<String>,
    pub location: String,
    pub meeting_url: Option<String>,
    pub timezone: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub image_url: Option<String>,
    pub created_by: String,
}

impl Event {
    pub fn new(params: NewEventParams) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: params.title,
            description: params.description,
            category_id: params.category_id,
            location: params.location,
            meeting_url: params.meeting_url,
            timezone: params.timezone,
            start_time: params.start_time,
            end_time: params.end_time,
            capacity: params.capacity,
            available_seats: params.capacity,
            status: EventStatus::Draft,
            image_url: params.image_url,
            created_by: params.created_by,
            reviewer_id: None,
            review_comment: None,
            submitted_at: None,
            reviewed_at: None,
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == EventStatus::Published
    }

    pub fn has_ended(&self) -> bool {
        self.end_time <= Utc::now()
    }
}

/// Listing filter. `None` fields are not applied.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    pub category_id: Option<String>,
    pub q: Option<String>,
    #[serde(default)]
    pub upcoming: bool,
}

#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationCounts {
    pub registered: i64,
    pub waitlisted: i64,
    pub attended: i64,
}

impl RegistrationCounts {
    pub fn seated(&self) -> i64 {
        self.registered + self.attended
    }
}

#[derive(Debug, Serialize)]
pub struct EventDetails {
    #[serde(flatten)]
    pub event: Event,
    pub category: Option<EventCategory>,
    pub lecturers: Vec<PublicProfile>,
    pub counts: RegistrationCounts,
}
