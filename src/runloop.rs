//! The single-threaded coordinator that owns a [`Session`]
//!
//! Every input, timer expiry and repository completion becomes a [`SessionEvent`] on one
//! queue. Events are applied strictly one at a time, so handlers never interleave.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::QuizConfig;
use crate::protocol::ClientMessage;
use crate::repository::{QuestionRepository, RepoResult};
use crate::state::{Effect, Session, SessionSnapshot, TimerKind};
use crate::types::*;

pub enum SessionEvent {
    Join(Participant),
    Leave(Participant),
    Client {
        participant: ParticipantId,
        message: ClientMessage,
    },
    Timer {
        generation: u64,
        timer: TimerKind,
    },
    CategoriesLoaded {
        generation: u64,
        ticket: u64,
        result: RepoResult<Vec<CategoryCount>>,
    },
    QuestionsLoaded {
        generation: u64,
        ticket: u64,
        result: RepoResult<Vec<Question>>,
    },
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Leaderboard(oneshot::Sender<Vec<ScoreEntry>>),
}

#[derive(Debug, thiserror::Error)]
#[error("session run-loop has stopped")]
pub struct SessionClosed;

/// Cheap cloneable handle for feeding the run-loop
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    /// Handle whose run-loop is already gone
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }

    pub fn send(&self, event: SessionEvent) -> Result<(), SessionClosed> {
        self.tx.send(event).map_err(|_| SessionClosed)
    }

    pub fn join(&self, participant: Participant) -> Result<(), SessionClosed> {
        self.send(SessionEvent::Join(participant))
    }

    pub fn leave(&self, participant: Participant) -> Result<(), SessionClosed> {
        self.send(SessionEvent::Leave(participant))
    }

    pub fn client_message(
        &self,
        participant: ParticipantId,
        message: ClientMessage,
    ) -> Result<(), SessionClosed> {
        self.send(SessionEvent::Client {
            participant,
            message,
        })
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionEvent::Snapshot(reply))?;
        rx.await.map_err(|_| SessionClosed)
    }

    pub async fn leaderboard(&self) -> Result<Vec<ScoreEntry>, SessionClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionEvent::Leaderboard(reply))?;
        rx.await.map_err(|_| SessionClosed)
    }
}

/// How repository calls are retried
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &QuizConfig) -> Self {
        Self {
            retries: config.repo_retries,
            backoff: config.repo_retry_backoff,
        }
    }
}

/// Retry transient failures with linear backoff
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> RepoResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RepoResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.retries => {
                attempt += 1;
                tracing::warn!(
                    "{} failed ({}), retry {}/{}",
                    what,
                    e,
                    attempt,
                    policy.retries
                );
                tokio::time::sleep(policy.backoff * attempt).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Spawn the run-loop task that owns `session`
pub fn spawn_session_loop(
    session: Session,
    repository: Arc<dyn QuestionRepository>,
) -> (SessionHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = SessionHandle { tx: tx.clone() };
    let policy = RetryPolicy::from_config(&session.config);

    let task = tokio::spawn(run(session, rx, tx, repository, policy));
    (handle, task)
}

async fn run(
    mut session: Session,
    mut rx: mpsc::UnboundedReceiver<SessionEvent>,
    tx: mpsc::UnboundedSender<SessionEvent>,
    repository: Arc<dyn QuestionRepository>,
    policy: RetryPolicy,
) {
    tracing::info!(
        "Session {} run-loop started (repository: {})",
        session.id,
        repository.name()
    );
    perform_effects(&mut session, &tx, &repository, policy);

    while let Some(event) = rx.recv().await {
        let now = tokio::time::Instant::now();
        match event {
            SessionEvent::Join(participant) => session.join(participant),
            SessionEvent::Leave(participant) => session.leave(&participant),
            SessionEvent::Client {
                participant,
                message,
            } => session.handle_client_message(&participant, message, now),
            SessionEvent::Timer { generation, timer } => session.on_timer(generation, timer, now),
            SessionEvent::CategoriesLoaded {
                generation,
                ticket,
                result,
            } => session.on_categories_loaded(generation, ticket, result),
            SessionEvent::QuestionsLoaded {
                generation,
                ticket,
                result,
            } => session.on_questions_loaded(generation, ticket, result),
            SessionEvent::Snapshot(reply) => {
                let _ = reply.send(session.snapshot());
            }
            SessionEvent::Leaderboard(reply) => {
                let _ = reply.send(session.leaderboard());
            }
        }
        perform_effects(&mut session, &tx, &repository, policy);
    }

    tracing::info!("Session {} run-loop stopped", session.id);
}

/// Timers and repository calls run as detached tasks and re-enter through the queue
fn perform_effects(
    session: &mut Session,
    tx: &mpsc::UnboundedSender<SessionEvent>,
    repository: &Arc<dyn QuestionRepository>,
    policy: RetryPolicy,
) {
    for effect in session.take_effects() {
        let tx = tx.clone();
        match effect {
            Effect::Schedule {
                generation,
                after,
                timer,
            } => {
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(SessionEvent::Timer { generation, timer });
                });
            }
            Effect::LoadCategories { generation, ticket } => {
                let repository = repository.clone();
                tokio::spawn(async move {
                    let repo = repository.as_ref();
                    let result =
                        with_retry(policy, "list categories", move || repo.list_categories())
                            .await;
                    let _ = tx.send(SessionEvent::CategoriesLoaded {
                        generation,
                        ticket,
                        result,
                    });
                });
            }
            Effect::LoadQuestions {
                generation,
                ticket,
                category,
                difficulty,
                count,
            } => {
                let repository = repository.clone();
                tokio::spawn(async move {
                    let repo = repository.as_ref();
                    let result = with_retry(policy, "fetch questions", move || {
                        repo.fetch_questions(category, difficulty, count)
                    })
                    .await;
                    let _ = tx.send(SessionEvent::QuestionsLoaded {
                        generation,
                        ticket,
                        result,
                    });
                });
            }
        }
    }
}
