use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoungeMessage {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub display_name: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PresenceChange {
    Joined,
    Left,
}

/// Frames pushed to lounge clients.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    Message {
        message: LoungeMessage,
    },
    Presence {
        user_id: String,
        display_name: String,
        change: PresenceChange,
        members: usize,
    },
    Error {
        message: String,
    },
    Pong,
}

/// Frames accepted from lounge clients.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    Chat { body: String },
    Ping,
}
