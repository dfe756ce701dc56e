//! In-process hub for the per-event virtual lounge.
//!
//! Each event gets a room with a broadcast channel and a bounded history.
//! Rooms are created when the first member joins and keep their history after
//! the last member leaves, so late joiners still see the conversation.
//! Only a join opens a room; messages for a closed room are refused.

use std::collections::{HashMap, VecDeque};
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;
use crate::domain::models::lounge::{LoungeMessage, PresenceChange, ServerFrame};
use crate::error::AppError;

pub const HISTORY_LIMIT: usize = 100;
pub const MAX_MESSAGE_CHARS: usize = 2000;
const CHANNEL_CAPACITY: usize = 256;

struct Room {
    sender: broadcast::Sender<ServerFrame>,
    history: VecDeque<LoungeMessage>,
    members: usize,
}

impl Room {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender, history: VecDeque::with_capacity(HISTORY_LIMIT), members: 0 }
    }
}

#[derive(Default)]
pub struct LoungeHub {
    rooms: RwLock<HashMap<String, Room>>,
}

impl LoungeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to the room and announces the newcomer. The receiver is
    /// created before the announcement, so the joiner sees its own presence frame.
    pub async fn join(&self, event_id: &str, user_id: &str, display_name: &str) -> (broadcast::Receiver<ServerFrame>, Vec<LoungeMessage>) {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(event_id.to_string()).or_insert_with(Room::new);

        let receiver = room.sender.subscribe();
        room.members += 1;
        let _ = room.sender.send(ServerFrame::Presence {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            change: PresenceChange::Joined,
            members: room.members,
        });

        (receiver, room.history.iter().cloned().collect())
    }

    pub async fn leave(&self, event_id: &str, user_id: &str, display_name: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get_mut(event_id) {
            room.members = room.members.saturating_sub(1);
            let _ = room.sender.send(ServerFrame::Presence {
                user_id: user_id.to_string(),
                display_name: display_name.to_string(),
                change: PresenceChange::Left,
                members: room.members,
            });
        }
    }

    /// Validates, stores and relays a chat message to everyone in the room.
    /// Fails with `Conflict` once the room has been closed.
    pub async fn post(&self, event_id: &str, user_id: &str, display_name: &str, body: &str) -> Result<LoungeMessage, AppError> {
        let body = validate_body(body)?;
        let message = LoungeMessage {
            id: Uuid::new_v4().to_string(),
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            body,
            sent_at: Utc::now(),
        };

        let mut rooms = self.rooms.write().await;
        let room = rooms
            .get_mut(event_id)
            .ok_or_else(|| AppError::Conflict("The lounge for this event is closed".into()))?;
        if room.history.len() == HISTORY_LIMIT {
            room.history.pop_front();
        }
        room.history.push_back(message.clone());
        let _ = room.sender.send(ServerFrame::Message { message: message.clone() });

        Ok(message)
    }

    pub async fn history(&self, event_id: &str) -> Vec<LoungeMessage> {
        let rooms = self.rooms.read().await;
        rooms
            .get(event_id)
            .map(|room| room.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn members(&self, event_id: &str) -> usize {
        self.rooms.read().await.get(event_id).map_or(0, |room| room.members)
    }

    /// Tells connected clients the room is closing and forgets it.
    pub async fn close_room(&self, event_id: &str, reason: &str) {
        if let Some(room) = self.rooms.write().await.remove(event_id) {
            let _ = room.sender.send(ServerFrame::Error { message: reason.to_string() });
        }
    }
}

pub fn validate_body(body: &str) -> Result<String, AppError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Message cannot be empty".into()));
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::Validation(format!(
            "Message cannot be longer than {} characters",
            MAX_MESSAGE_CHARS
        )));
    }
    Ok(trimmed.to_string())
}
