use crate::domain::models::user::Role;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub title: Option<String>,
    pub institution: Option<String>,
    pub department: Option<String>,
    pub bio: Option<String>,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
}

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub is_active: bool,
}

#[derive(Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateEventRequest {
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
}

#[derive(Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub location: Option<String>,
    pub meeting_url: Option<String>,
    pub timezone: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub capacity: Option<i32>,
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
pub struct LecturerRequest {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct SubmitForReviewRequest {
    pub reviewer_id: String,
}

#[derive(Deserialize)]
pub struct ReviewDecisionRequest {
    pub comment: Option<String>,
}

#[derive(Deserialize)]
pub struct CheckInRequest {
    pub qr_code: String,
}

#[derive(Deserialize)]
pub struct JobListQuery {
    pub limit: Option<i32>,
}

#[derive(Deserialize)]
pub struct MailLogQuery {
    pub recipient: Option<String>,
}
