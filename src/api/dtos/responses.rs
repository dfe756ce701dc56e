use crate::domain::models::{registration::Registration, user::PublicProfile};
use serde::Serialize;

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Serialize)]
pub struct CheckInResponse {
    pub registration: Registration,
    pub attendee: PublicProfile,
}
