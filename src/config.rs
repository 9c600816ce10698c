//! Game configuration loaded from the environment

use std::str::FromStr;
use std::time::Duration;

use crate::types::{CategoryId, GameMode};

/// Tunables for one game session
#[derive(Debug, Clone)]
pub struct QuizConfig {
    /// Mode preselected in the title menu
    pub default_mode: GameMode,
    pub questions_per_round: usize,
    /// Timed mode: question visible before answers unlock
    pub display_window: Duration,
    /// Timed mode: how long players may answer
    pub answer_window: Duration,
    /// Timed mode: pause after a reveal before the next question
    pub reveal_window: Duration,
    pub round_intro: Duration,
    pub scoreboard_pause: Duration,
    pub highlight_clear: Duration,
    /// First round played at medium difficulty
    pub medium_from_round: u32,
    /// First round played at hard difficulty
    pub hard_from_round: u32,
    /// Categories need at least this many questions of a difficulty to enter its pool
    pub min_questions_per_category: u32,
    pub excluded_categories: Vec<CategoryId>,
    pub repo_retries: u32,
    pub repo_retry_backoff: Duration,
    pub port: u16,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            default_mode: GameMode::HostModerated,
            questions_per_round: 5,
            display_window: Duration::from_millis(2000),
            answer_window: Duration::from_secs(10),
            reveal_window: Duration::from_secs(5),
            round_intro: Duration::from_secs(5),
            scoreboard_pause: Duration::from_secs(3),
            highlight_clear: Duration::from_millis(3000),
            medium_from_round: 6,
            hard_from_round: 11,
            min_questions_per_category: 10,
            excluded_categories: Vec::new(),
            repo_retries: 3,
            repo_retry_backoff: Duration::from_millis(500),
            port: 6574,
        }
    }
}

/// Read and parse an env var, warning and falling back when it is malformed
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
                default
            }
        },
        _ => default,
    }
}

fn env_secs(key: &str, default: Duration) -> Duration {
    Duration::from_secs(env_or(key, default.as_secs()))
}

fn env_millis(key: &str, default: Duration) -> Duration {
    Duration::from_millis(env_or(key, default.as_millis() as u64))
}

impl QuizConfig {
    pub fn from_env() -> Self {
        let d = Self::default();

        let excluded_categories = std::env::var("QUIZ_EXCLUDED_CATEGORIES")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .filter_map(|part| {
                        let part = part.trim();
                        if part.is_empty() {
                            return None;
                        }
                        part.parse().ok().or_else(|| {
                            tracing::warn!("Ignoring invalid excluded category {:?}", part);
                            None
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut config = Self {
            default_mode: env_or("QUIZ_MODE", d.default_mode),
            questions_per_round: env_or("QUIZ_QUESTIONS_PER_ROUND", d.questions_per_round),
            display_window: env_millis("QUIZ_DISPLAY_WINDOW_MS", d.display_window),
            answer_window: env_secs("QUIZ_ANSWER_WINDOW_SECS", d.answer_window),
            reveal_window: env_secs("QUIZ_REVEAL_WINDOW_SECS", d.reveal_window),
            round_intro: env_secs("QUIZ_ROUND_INTRO_SECS", d.round_intro),
            scoreboard_pause: env_secs("QUIZ_SCOREBOARD_PAUSE_SECS", d.scoreboard_pause),
            highlight_clear: env_millis("QUIZ_HIGHLIGHT_CLEAR_MS", d.highlight_clear),
            medium_from_round: env_or("QUIZ_MEDIUM_FROM_ROUND", d.medium_from_round),
            hard_from_round: env_or("QUIZ_HARD_FROM_ROUND", d.hard_from_round),
            min_questions_per_category: env_or(
                "QUIZ_MIN_QUESTIONS_PER_CATEGORY",
                d.min_questions_per_category,
            ),
            excluded_categories,
            repo_retries: env_or("QUIZ_REPO_RETRIES", d.repo_retries),
            repo_retry_backoff: env_millis("QUIZ_REPO_RETRY_BACKOFF_MS", d.repo_retry_backoff),
            port: env_or("QUIZ_PORT", d.port),
        };

        if config.questions_per_round == 0 {
            tracing::warn!("QUIZ_QUESTIONS_PER_ROUND must be positive, using default");
            config.questions_per_round = d.questions_per_round;
        }
        if config.hard_from_round < config.medium_from_round {
            tracing::warn!(
                "QUIZ_HARD_FROM_ROUND ({}) is below QUIZ_MEDIUM_FROM_ROUND ({}), using defaults",
                config.hard_from_round,
                config.medium_from_round
            );
            config.medium_from_round = d.medium_from_round;
            config.hard_from_round = d.hard_from_round;
        }

        config
    }
}
