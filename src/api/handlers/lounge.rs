use axum::{
    extract::{ws::{Message, WebSocket}, Path, State, WebSocketUpgrade},
    response::{IntoResponse, Response},
    Json,
};
use crate::state::AppState;
use crate::api::extractors::auth::AuthUser;
use crate::api::handlers::access::{ensure_participant, load_event};
use crate::domain::models::{
    event::{Event, EventStatus},
    lounge::{ClientFrame, ServerFrame},
    user::User,
};
use crate::error::AppError;
use futures::{stream::{SplitSink, StreamExt}, SinkExt};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

type SocketSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

pub async fn lounge_socket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
) -> Result<Response, AppError> {
    let event = load_event(&state, &event_id).await?;
    ensure_lounge_access(&state, &event, &user).await?;

    info!("Lounge connection requested for {} by {}", event.id, user.id);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, event.id, user)))
}

pub async fn lounge_messages(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    ensure_lounge_access(&state, &event, &user).await?;

    Ok(Json(state.lounge.history(&event.id).await))
}

async fn ensure_lounge_access(state: &AppState, event: &Event, user: &User) -> Result<(), AppError> {
    ensure_participant(state, event, user).await?;
    if event.status != EventStatus::Published {
        return Err(AppError::Conflict("The lounge is only open for published events".into()));
    }
    Ok(())
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, event_id: String, user: User) {
    let display_name = user.display_name();
    let (frames, history) = state.lounge.join(&event_id, &user.id, &display_name).await;

    let (sender, mut receiver) = socket.split();
    let sender: SocketSender = Arc::new(Mutex::new(sender));

    for message in history {
        if !send_frame(&sender, &ServerFrame::Message { message }).await {
            state.lounge.leave(&event_id, &user.id, &display_name).await;
            return;
        }
    }

    let mut forward_task = tokio::spawn(forward_frames(frames, sender.clone()));

    let receive_state = state.clone();
    let receive_event = event_id.clone();
    let receive_user = user.id.clone();
    let receive_name = display_name.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            let reply = match serde_json::from_str::<ClientFrame>(text.as_str()) {
                Ok(ClientFrame::Chat { body }) => {
                    match receive_state.lounge.post(&receive_event, &receive_user, &receive_name, &body).await {
                        Ok(_) => None,
                        Err(e) => Some(ServerFrame::Error { message: client_message(&e) }),
                    }
                }
                Ok(ClientFrame::Ping) => Some(ServerFrame::Pong),
                Err(_) => Some(ServerFrame::Error { message: "Unrecognised frame".into() }),
            };

            if let Some(frame) = reply {
                if !send_frame(&sender, &frame).await {
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut forward_task => receive_task.abort(),
        _ = &mut receive_task => forward_task.abort(),
    }

    state.lounge.leave(&event_id, &user.id, &display_name).await;
    debug!("Lounge connection closed for {} in {}", user.id, event_id);
}

/// Relays room broadcasts to one client until either side goes away.
async fn forward_frames(mut frames: broadcast::Receiver<ServerFrame>, sender: SocketSender) {
    loop {
        match frames.recv().await {
            Ok(frame) => {
                if !send_frame(&sender, &frame).await {
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Lounge client lagged behind, {} frames dropped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => {
                let _ = sender.lock().await.send(Message::Close(None)).await;
                return;
            }
        }
    }
}

async fn send_frame(sender: &SocketSender, frame: &ServerFrame) -> bool {
    let Ok(json) = serde_json::to_string(frame) else {
        return false;
    };
    sender.lock().await.send(Message::Text(json.into())).await.is_ok()
}

fn client_message(error: &AppError) -> String {
    match error {
        AppError::Validation(msg) | AppError::Conflict(msg) => msg.clone(),
        _ => "Message could not be delivered".to_string(),
    }
}
