pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::app::AppState;
use crate::protocol::ServerMessage;
use crate::types::Participant;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Stable user id; reconnecting with the same id resumes the same participant
    pub user: Option<String>,
    pub name: Option<String>,
    /// Shared moderator key
    pub key: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!(
        "WebSocket connection request: user={:?}, name={:?}",
        params.user,
        params.name
    );

    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// Build the participant identity from the connection query
pub fn participant_from_query(params: &WsQuery, state: &AppState) -> Participant {
    let id = params
        .user
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| ulid::Ulid::new().to_string());

    let name = params
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| petname::petname(2, "-"))
        .unwrap_or_else(|| "guest".to_string());

    let mut participant = Participant::new(id, name);
    participant.external_privileged = state.auth.validate(params.key.as_deref());
    participant
}

async fn send_json(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let participant = participant_from_query(&params, &state);
    let participant_id = participant.id.clone();
    let display_name = participant.name.clone();
    if participant.external_privileged {
        tracing::info!("{} connected with moderator key", participant_id);
    }

    // Subscribe before joining so nothing the join triggers is missed
    let mut outbound_rx = state.outbound.subscribe();

    if state.session.join(participant.clone()).is_err() {
        let _ = send_json(&mut sender, &handlers::session_unavailable()).await;
        return;
    }

    let snapshot = match state.session.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(_) => {
            let _ = send_json(&mut sender, &handlers::session_unavailable()).await;
            return;
        }
    };

    let welcome = ServerMessage::Welcome {
        protocol: "1.0".to_string(),
        participant_id: participant_id.clone(),
        display_name,
        snapshot,
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if !send_json(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        let _ = state.session.leave(participant);
        return;
    }

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                match outbound {
                    Ok(out) => {
                        if out.is_for(&participant_id)
                            && !send_json(&mut sender, &out.message).await
                        {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("{} lagged behind by {} messages", participant_id, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message from {}: {}", participant_id, text);
                        if let Some(response) =
                            handlers::handle_text(&text, &participant_id, &state)
                        {
                            if !send_json(&mut sender, &response).await {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    let _ = state.session.leave(participant);
    tracing::info!("WebSocket connection closed for {}", participant_id);
}
