use crate::domain::models::{
    auth::{RefreshTokenRecord, TokenPurpose, VerificationToken},
    category::EventCategory,
    communication::MailLog,
    event::{Event, EventFilter, RegistrationCounts},
    job::Job,
    material::EventMaterial,
    registration::{Attendee, CancellationOutcome, Registration, UserRegistration},
    user::{Role, User},
};
use crate::error::AppError;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn list(&self, role: Option<Role>) -> Result<Vec<User>, AppError>;
    async fn update(&self, user: &User) -> Result<User, AppError>;
}

#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn create_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError>;
    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError>;
    async fn delete_refresh_token(&self, token_hash: &str) -> Result<(), AppError>;
    async fn delete_refresh_family(&self, family_id: Uuid) -> Result<(), AppError>;
    async fn delete_refresh_tokens_for_user(&self, user_id: &str) -> Result<(), AppError>;

    async fn create_verification_token(&self, token: &VerificationToken) -> Result<(), AppError>;
    /// Deletes and returns the token, so each token can be redeemed once.
    async fn consume_verification_token(&self, token_hash: &str, purpose: TokenPurpose) -> Result<Option<VerificationToken>, AppError>;
    async fn delete_verification_tokens(&self, user_id: &str, purpose: TokenPurpose) -> Result<(), AppError>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: &EventCategory) -> Result<EventCategory, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<EventCategory>, AppError>;
    async fn list(&self) -> Result<Vec<EventCategory>, AppError>;
    async fn update(&self, category: &EventCategory) -> Result<EventCategory, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: &Event) -> Result<Event, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError>;
    async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, AppError>;
    /// Events the user created or lectures at.
    async fn list_for_organizer(&self, user_id: &str) -> Result<Vec<Event>, AppError>;
    async fn list_pending_review(&self, reviewer_id: &str) -> Result<Vec<Event>, AppError>;
    /// Writes descriptive and workflow columns. Seat columns are owned by the registration repository.
    async fn update(&self, event: &Event) -> Result<Event, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;

    async fn add_lecturer(&self, event_id: &str, user_id: &str) -> Result<(), AppError>;
    async fn remove_lecturer(&self, event_id: &str, user_id: &str) -> Result<(), AppError>;
    async fn list_lecturers(&self, event_id: &str) -> Result<Vec<User>, AppError>;
    async fn is_lecturer(&self, event_id: &str, user_id: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    /// Claims a seat if one is free, otherwise appends to the waitlist. Atomic per event.
    async fn register(&self, registration: &Registration) -> Result<Registration, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Registration>, AppError>;
    async fn find_for_user(&self, event_id: &str, user_id: &str) -> Result<Option<Registration>, AppError>;
    async fn find_by_qr_code(&self, event_id: &str, qr_code: &str) -> Result<Option<Registration>, AppError>;
    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Registration>, AppError>;
    async fn list_attendees(&self, event_id: &str) -> Result<Vec<Attendee>, AppError>;
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<UserRegistration>, AppError>;
    async fn counts(&self, event_id: &str) -> Result<RegistrationCounts, AppError>;
    /// Deletes the registration and promotes/renumbers the waitlist in one transaction.
    async fn cancel(&self, registration: &Registration) -> Result<CancellationOutcome, AppError>;
    /// REGISTERED -> ATTENDED. `None` when the registration was not in REGISTERED state.
    async fn mark_attended(&self, id: &str) -> Result<Option<Registration>, AppError>;
    /// Sets a new capacity and promotes waitlisted users into freed seats. Returns the promoted rows.
    async fn resize_capacity(&self, event_id: &str, capacity: i32) -> Result<Vec<Registration>, AppError>;
}

#[async_trait]
pub trait MaterialRepository: Send + Sync {
    async fn create(&self, material: &EventMaterial) -> Result<EventMaterial, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<EventMaterial>, AppError>;
    async fn list_by_event(&self, event_id: &str) -> Result<Vec<EventMaterial>, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &Job) -> Result<Job, AppError>;
    async fn find_pending(&self, limit: i32) -> Result<Vec<Job>, AppError>;
    async fn list_recent(&self, limit: i32) -> Result<Vec<Job>, AppError>;
    async fn update_status(&self, id: &str, status: &str, error_message: Option<String>) -> Result<(), AppError>;
    async fn cancel_jobs_for_registration(&self, registration_id: &str) -> Result<(), AppError>;
    /// Cancels the pending jobs of one type for an event. Returns how many were cancelled.
    async fn cancel_event_jobs(&self, event_id: &str, job_type: &str) -> Result<u64, AppError>;
}

#[async_trait]
pub trait CommunicationRepository: Send + Sync {
    async fn log_mail(&self, log: &MailLog) -> Result<(), AppError>;
    async fn has_mail_been_sent(&self, recipient: &str, template_id: &str, context_hash: &str) -> Result<bool, AppError>;
    async fn list_logs(&self, recipient: Option<&str>) -> Result<Vec<MailLog>, AppError>;
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str, attachment_name: Option<&str>, attachment_data: Option<&[u8]>) -> Result<(), AppError>;
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), AppError>;
    async fn load(&self, key: &str) -> Result<Vec<u8>, AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
    /// Public URL for a stored object, if the backend serves one.
    fn public_url(&self, key: &str) -> String;
}
