use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::AuthConfig;
use crate::config::QuizConfig;
use crate::presentation::BroadcastBridge;
use crate::protocol::Outbound;
use crate::repository::QuestionRepository;
use crate::runloop::{spawn_session_loop, SessionHandle};
use crate::state::Session;
use crate::{api, ws};

/// Shared application state handed to every request
#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
    /// Everything the session shows, fanned out to websocket clients
    pub outbound: broadcast::Sender<Outbound>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    /// Create the session, wire it to a broadcast presentation bridge and start its run-loop
    pub fn start(
        config: QuizConfig,
        repository: Arc<dyn QuestionRepository>,
        auth: AuthConfig,
    ) -> Self {
        let (outbound, _rx) = broadcast::channel(256);
        let bridge = Arc::new(BroadcastBridge::new(outbound.clone()));
        let session = Session::new(config, bridge);
        tracing::info!("Created session {}", session.id);

        let (handle, _task) = spawn_session_loop(session, repository);
        Self {
            session: handle,
            outbound,
            auth: Arc::new(auth),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/session", get(api::get_session))
        .route("/api/leaderboard", get(api::get_leaderboard))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
