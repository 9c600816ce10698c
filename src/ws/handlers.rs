//! WebSocket message dispatch
//!
//! Clients never touch game state directly: every parsed message is queued on the
//! session run-loop, which decides whether the sender may perform it.

use crate::app::AppState;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::types::ParticipantId;

pub fn session_unavailable() -> ServerMessage {
    ServerMessage::Error {
        code: "SESSION_UNAVAILABLE".to_string(),
        msg: "The game session is not running".to_string(),
    }
}

/// Parse a text frame and forward it; returns a reply for the sender only on failure
pub fn handle_text(
    text: &str,
    participant: &ParticipantId,
    state: &AppState,
) -> Option<ServerMessage> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => handle_message(msg, participant, state),
        Err(e) => {
            tracing::error!("Failed to parse client message: {}", e);
            Some(ServerMessage::Error {
                code: "PARSE_ERROR".to_string(),
                msg: format!("Invalid message format: {}", e),
            })
        }
    }
}

pub fn handle_message(
    msg: ClientMessage,
    participant: &ParticipantId,
    state: &AppState,
) -> Option<ServerMessage> {
    match state.session.client_message(participant.clone(), msg) {
        Ok(()) => None,
        Err(e) => {
            tracing::error!("Dropping message from {}: {}", participant, e);
            Some(session_unavailable())
        }
    }
}
