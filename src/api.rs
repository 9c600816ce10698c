//! Read-only HTTP endpoints for observing the session.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;
use crate::state::format_scoreboard;
use crate::types::ScoreEntry;

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<ScoreEntry>,
    /// Same ranking as rendered on the scoreboard
    pub text: String,
}

fn unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        "Session is not running".to_string(),
    )
        .into_response()
}

/// Current session state.
///
/// GET /api/session
pub async fn get_session(State(state): State<Arc<AppState>>) -> Response {
    match state.session.snapshot().await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => {
            tracing::error!("Snapshot failed: {}", e);
            unavailable()
        }
    }
}

/// Merged player and podium scores, highest first.
///
/// GET /api/leaderboard
pub async fn get_leaderboard(State(state): State<Arc<AppState>>) -> Response {
    match state.session.leaderboard().await {
        Ok(entries) => {
            let text = format_scoreboard(&entries);
            Json(LeaderboardResponse { entries, text }).into_response()
        }
        Err(e) => {
            tracing::error!("Leaderboard failed: {}", e);
            unavailable()
        }
    }
}
