//! Question repository
//!
//! Supplies category metadata and randomized question batches. The game core only reads from it.

mod memory;
mod opentdb;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use memory::InMemoryRepository;
pub use opentdb::OpenTdbRepository;

use crate::types::{CategoryCount, CategoryId, Difficulty, Question};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors that can occur while talking to a question source
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Question API returned response code {0}")]
    Api(u8),

    #[error("Response parsing failed: {0}")]
    Parse(String),

    #[error("Question bank I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl RepoError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            RepoError::Http(_) | RepoError::Timeout(_) => true,
            // 5 = rate limited
            RepoError::Api(code) => *code == 5,
            RepoError::Parse(_) | RepoError::Io(_) => false,
        }
    }
}

/// Trait that every question source must implement
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// All categories with their per-difficulty question counts
    async fn list_categories(&self) -> RepoResult<Vec<CategoryCount>>;

    /// Up to `count` randomly sampled questions; may return fewer
    async fn fetch_questions(
        &self,
        category: CategoryId,
        difficulty: Difficulty,
        count: usize,
    ) -> RepoResult<Vec<Question>>;

    /// Get the name of this repository
    fn name(&self) -> &str;
}

/// Where questions come from
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// JSON question bank on disk; takes precedence over the HTTP source
    pub bank_path: Option<PathBuf>,
    pub opentdb_base_url: String,
    pub request_timeout: Duration,
}

impl RepositoryConfig {
    pub fn from_env() -> Self {
        let bank_path = std::env::var("QUESTION_BANK_PATH").ok().and_then(|path| {
            let trimmed = path.trim();
            (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
        });

        let opentdb_base_url = std::env::var("OPENTDB_BASE_URL")
            .ok()
            .and_then(|url| {
                let trimmed = url.trim().trim_end_matches('/');
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| "https://opentdb.com".to_string());

        Self {
            bank_path,
            opentdb_base_url,
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Build the configured repository
    pub fn build(&self) -> RepoResult<Arc<dyn QuestionRepository>> {
        match &self.bank_path {
            Some(path) => {
                let repo = InMemoryRepository::from_json_file(path)?;
                tracing::info!(
                    "Loaded {} questions from {}",
                    repo.len(),
                    path.display()
                );
                Ok(Arc::new(repo))
            }
            None => {
                tracing::info!("Using OpenTDB at {}", self.opentdb_base_url);
                Ok(Arc::new(OpenTdbRepository::new(
                    self.opentdb_base_url.clone(),
                    self.request_timeout,
                )?))
            }
        }
    }
}
