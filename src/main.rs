use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizshow::{app, auth::AuthConfig, config::QuizConfig, repository::RepositoryConfig};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizshow=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting quizshow...");

    let config = QuizConfig::from_env();
    let auth_config = AuthConfig::from_env();

    let repository = match RepositoryConfig::from_env().build() {
        Ok(repository) => {
            tracing::info!("Question repository: {}", repository.name());
            repository
        }
        Err(e) => {
            tracing::error!("Failed to initialize question repository: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;
    let state = Arc::new(app::AppState::start(config, repository, auth_config));
    let router = app::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, router).await.unwrap();
}
