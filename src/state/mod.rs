mod category;
mod player;
mod podium;
mod question;
mod registry;
mod round;
mod score;
mod timed;

pub use category::{difficulty_for_round, CategoryPools};
pub use question::{shuffle, PresentedQuestion};
pub use registry::ParticipantRegistry;
pub use score::format_scoreboard;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::QuizConfig;
use crate::presentation::{DisplayTarget, PresentationBridge, PresentationExt};
use crate::protocol::ClientMessage;
use crate::repository::RepoResult;
use crate::types::*;

/// Timers the session asks the run-loop to schedule
#[derive(Debug, Clone, PartialEq)]
pub enum TimerKind {
    /// Round banner has been shown long enough
    RoundIntroElapsed,
    /// Question has been on screen for the display window
    OpenAnswers,
    /// Once per second while answers are open; `remaining == 0` closes them
    CountdownTick { remaining: u64 },
    /// Reveal window is over, show the next question
    NextQuestion,
    /// Last reveal of the round is over, show the scoreboard
    ShowRoundScores,
    ClearPlayerHighlights { round: u32, question: usize },
}

/// Asynchronous work requested by the session, performed by the run-loop
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Schedule {
        generation: u64,
        after: Duration,
        timer: TimerKind,
    },
    LoadCategories {
        generation: u64,
        ticket: u64,
    },
    LoadQuestions {
        generation: u64,
        ticket: u64,
        category: CategoryId,
        difficulty: Difficulty,
        count: usize,
    },
}

/// One game instance, owned and mutated exclusively by its run-loop
pub struct Session {
    pub id: SessionId,
    pub config: QuizConfig,
    pub game_mode: GameMode,
    pub mode: Mode,
    /// Bumped on full reset; timers and loads from older generations are discarded
    pub generation: u64,
    pub current_round: u32,
    pub pools: CategoryPools,
    pub categories_ready: bool,
    /// Categories currently offered on the answer slots (host-moderated)
    pub category_options: Vec<Category>,
    pub round_category: Option<Category>,
    pub round_difficulty: Difficulty,
    pub loaded_questions: Vec<Question>,
    pub current_question_index: Option<usize>,
    pub current_question: Option<PresentedQuestion>,
    pub selected_answer: Option<usize>,
    pub answer_lock: AnswerLock,
    /// The current tentative selection was made by a driver, not a podium
    pub driver_selected: bool,
    pub answers_open: bool,
    pub answer_deadline: Option<Instant>,
    pub scores_on_screen: bool,
    pub buzz_winner: Option<usize>,
    pub podiums: Vec<Podium>,
    pub players: Vec<Player>,
    pub registry: ParticipantRegistry,
    pub host: Option<ParticipantId>,
    pub load_state: LoadState,
    pub winner: Option<ParticipantId>,
    next_ticket: u64,
    effects: Vec<Effect>,
    presentation: Arc<dyn PresentationBridge>,
}

/// Read-only view of a session; never exposes the correct answer slot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub game_mode: GameMode,
    pub mode: Mode,
    pub generation: u64,
    pub current_round: u32,
    pub difficulty: Difficulty,
    pub categories_ready: bool,
    pub pool_sizes: [usize; 3],
    pub category_options: Vec<Category>,
    pub round_category: Option<Category>,
    pub question_number: Option<usize>,
    pub question_count: usize,
    pub question: Option<String>,
    pub answers: Option<[String; ANSWER_COUNT]>,
    pub selected_answer: Option<usize>,
    pub answer_lock: AnswerLock,
    pub answers_open: bool,
    pub scores_on_screen: bool,
    pub buzz_winner: Option<usize>,
    pub podiums: Vec<Podium>,
    pub players: Vec<Player>,
    pub host: Option<ParticipantId>,
    pub moderator: Option<ParticipantId>,
    pub participants: usize,
    pub load_state: LoadState,
    pub winner: Option<ParticipantId>,
}

impl Session {
    pub fn new(config: QuizConfig, presentation: Arc<dyn PresentationBridge>) -> Self {
        let mut session = Self {
            id: ulid::Ulid::new().to_string(),
            game_mode: config.default_mode,
            config,
            mode: Mode::Title,
            generation: 0,
            current_round: 0,
            pools: CategoryPools::default(),
            categories_ready: false,
            category_options: Vec::new(),
            round_category: None,
            round_difficulty: Difficulty::Easy,
            loaded_questions: Vec::new(),
            current_question_index: None,
            current_question: None,
            selected_answer: None,
            answer_lock: AnswerLock::Unlocked,
            driver_selected: false,
            answers_open: false,
            answer_deadline: None,
            scores_on_screen: false,
            buzz_winner: None,
            podiums: (0..PODIUM_COUNT).map(|_| Podium::empty()).collect(),
            players: Vec::new(),
            registry: ParticipantRegistry::new(),
            host: None,
            load_state: LoadState::Idle,
            winner: None,
            next_ticket: 0,
            effects: Vec::new(),
            presentation,
        };
        session.request_categories();
        session
    }

    /// Drain the asynchronous work queued by the last handler
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub(crate) fn schedule(&mut self, after: Duration, timer: TimerKind) {
        self.effects.push(Effect::Schedule {
            generation: self.generation,
            after,
            timer,
        });
    }

    fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.load_state = LoadState::Pending {
            ticket: self.next_ticket,
        };
        self.next_ticket
    }

    pub(crate) fn request_categories(&mut self) {
        let ticket = self.issue_ticket();
        self.categories_ready = false;
        self.effects.push(Effect::LoadCategories {
            generation: self.generation,
            ticket,
        });
    }

    pub(crate) fn request_questions(
        &mut self,
        category: CategoryId,
        difficulty: Difficulty,
        count: usize,
    ) {
        let ticket = self.issue_ticket();
        self.effects.push(Effect::LoadQuestions {
            generation: self.generation,
            ticket,
            category,
            difficulty,
            count,
        });
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.load_state, LoadState::Pending { .. })
    }

    /// Whether a completion with this generation and ticket is still awaited
    fn accepts(&self, generation: u64, ticket: u64) -> bool {
        generation == self.generation && self.load_state == LoadState::Pending { ticket }
    }

    /// Moderator, externally privileged user, or the seated host
    pub fn can_drive(&self, actor: &ParticipantId) -> bool {
        self.registry.is_privileged(actor) || self.host.as_ref() == Some(actor)
    }

    /// Difficulty of the round about to start
    pub fn next_round_difficulty(&self) -> Difficulty {
        difficulty_for_round(
            self.current_round + 1,
            self.config.medium_from_round,
            self.config.hard_from_round,
        )
    }

    // ---- Membership ----

    pub fn join(&mut self, participant: Participant) {
        tracing::info!(
            "Participant {} ({}) joined session {}",
            participant.id,
            participant.name,
            self.id
        );
        if let Some(moderator) = self.registry.join(participant) {
            self.announce_moderator(&moderator);
        }
    }

    /// One socket of `departing` closed; the participant leaves with their last socket
    pub fn leave(&mut self, departing: &Participant) {
        let participant = &departing.id;
        let (removed, new_moderator) = self.registry.leave(departing);
        if !removed {
            return;
        }
        tracing::info!("Participant {} left session {}", participant, self.id);

        if let Some(moderator) = new_moderator {
            self.announce_moderator(&moderator);
        }
        if self.host.as_ref() == Some(participant) {
            self.clear_host();
        }
        if let Some(index) = self.podium_of(participant) {
            self.vacate_podium(index);
        }
    }

    fn announce_moderator(&self, moderator: &ParticipantId) {
        tracing::info!("{} is now the game moderator", moderator);
        self.presentation
            .notify(moderator, "You are now the game moderator.");
    }

    // ---- Input dispatch ----

    /// Apply one client input. Capability violations are ignored silently.
    pub fn handle_client_message(
        &mut self,
        actor: &ParticipantId,
        msg: ClientMessage,
        now: Instant,
    ) {
        if !self.registry.contains(actor) {
            tracing::debug!("Ignoring {:?} from unknown participant {}", msg, actor);
            return;
        }

        match msg {
            ClientMessage::ChooseMode { mode } => self.choose_mode(actor, mode),
            ClientMessage::ClaimHost => self.claim_host(actor),
            ClientMessage::JoinGame => self.join_game(actor),
            ClientMessage::StartGame => self.start_game(actor),
            ClientMessage::JoinPodium { podium } => self.join_podium(podium, actor),
            ClientMessage::LeavePodium { podium } => self.leave_podium(podium, actor),
            ClientMessage::Buzz { podium } => {
                self.buzz(podium, actor);
            }
            ClientMessage::SelectAnswer { index } => self.press_answer(actor, index, now),
            ClientMessage::ConfirmAnswer => self.confirm_answer(actor),
            ClientMessage::Advance => self.advance(actor),
            ClientMessage::ResetBuzz => {
                if self.can_drive(actor) {
                    self.reset_buzz();
                }
            }
            ClientMessage::AdjustScore { podium, delta } => {
                if self.can_drive(actor) {
                    self.adjust_score(podium, delta);
                }
            }
            ClientMessage::Kick { podium } => {
                if self.can_drive(actor) {
                    self.kick(podium);
                }
            }
            ClientMessage::ToggleScores => {
                if self.can_drive(actor) && self.mode != Mode::GameOver {
                    self.toggle_scores();
                }
            }
            ClientMessage::NextRound => self.next_round(actor),
            ClientMessage::EndGame => self.press_end_game(actor),
            ClientMessage::ResetGame => {
                if self.can_drive(actor) {
                    self.reset();
                } else {
                    tracing::debug!("Ignoring reset from non-privileged {}", actor);
                }
            }
        }
    }

    fn choose_mode(&mut self, actor: &ParticipantId, mode: GameMode) {
        if self.mode != Mode::Title || !self.registry.is_privileged(actor) {
            return;
        }
        tracing::info!("Game mode set to {:?}", mode);
        self.game_mode = mode;
        let prompt = match mode {
            GameMode::HostModerated => "Claim the host seat and press Next to begin",
            GameMode::Timed => "Press Join Game, then Start Game",
        };
        self.presentation.set_text(DisplayTarget::Prompt, prompt);
    }

    /// Answer slot pressed: category choice, answer selection or timed submission
    fn press_answer(&mut self, actor: &ParticipantId, index: usize, now: Instant) {
        if index >= ANSWER_COUNT {
            return;
        }
        match (self.game_mode, self.mode) {
            (GameMode::Timed, Mode::Question) => {
                self.submit_answer(actor, index, now);
            }
            (GameMode::HostModerated, Mode::CategorySelect) => {
                if self.can_drive(actor)
                    && !self.is_loading()
                    && index < self.category_options.len()
                {
                    self.select_answer(Some(index), true, false);
                }
            }
            (GameMode::HostModerated, Mode::Question) => self.podium_select(actor, index),
            _ => {}
        }
    }

    // ---- Repository completions ----

    pub fn on_categories_loaded(
        &mut self,
        generation: u64,
        ticket: u64,
        result: RepoResult<Vec<CategoryCount>>,
    ) {
        if !self.accepts(generation, ticket) {
            tracing::debug!(
                "Discarding stale category list (generation {}, ticket {})",
                generation,
                ticket
            );
            return;
        }

        match result {
            Ok(counts) => {
                self.pools = CategoryPools::from_counts(
                    &counts,
                    self.config.min_questions_per_category,
                    &self.config.excluded_categories,
                );
                self.categories_ready = true;
                self.load_state = LoadState::Idle;
                tracing::info!(
                    "Category pools ready: {} easy, {} medium, {} hard",
                    self.pools.easy.len(),
                    self.pools.medium.len(),
                    self.pools.hard.len()
                );
            }
            Err(e) => {
                tracing::error!("Failed to load categories: {}", e);
                self.fail_load(format!("Cannot start game: question source unavailable ({})", e));
            }
        }
    }

    /// Leave the session in an observable failed state and tell whoever drives it
    pub(crate) fn fail_load(&mut self, message: String) {
        self.load_state = LoadState::Failed {
            message: message.clone(),
        };
        self.presentation.set_text(DisplayTarget::Prompt, message.as_str());

        let mut recipients: Vec<ParticipantId> = Vec::new();
        if let Some(moderator) = self.registry.moderator() {
            recipients.push(moderator.clone());
        }
        if let Some(host) = &self.host {
            if !recipients.contains(host) {
                recipients.push(host.clone());
            }
        }
        for r in recipients {
            self.presentation.notify(&r, &message);
        }
    }

    pub fn on_timer(&mut self, generation: u64, timer: TimerKind, now: Instant) {
        if generation != self.generation {
            tracing::debug!("Discarding stale timer {:?} from generation {}", timer, generation);
            return;
        }
        self.handle_timer(timer, now);
    }

    // ---- Full reset ----

    /// Back to the title screen with a fresh game; connections are kept
    pub fn reset(&mut self) {
        self.generation += 1;
        tracing::info!("Resetting session {} (generation {})", self.id, self.generation);

        for index in 0..self.podiums.len() {
            self.vacate_podium(index);
        }
        self.hide_scores();
        self.clear_host();

        self.mode = Mode::Title;
        self.current_round = 0;
        self.category_options.clear();
        self.round_category = None;
        self.round_difficulty = Difficulty::Easy;
        self.loaded_questions.clear();
        self.current_question_index = None;
        self.current_question = None;
        self.select_answer(None, true, false);
        self.answer_lock = AnswerLock::Unlocked;
        self.driver_selected = false;
        self.answers_open = false;
        self.answer_deadline = None;
        self.buzz_winner = None;
        self.players.clear();
        self.winner = None;
        self.pools = CategoryPools::default();

        self.presentation.set_camera_focus(None);
        self.presentation.set_text(DisplayTarget::Question, "");
        self.presentation.set_text(DisplayTarget::Winner, "");
        self.presentation.set_text(DisplayTarget::PlayerCount, "0 Players");
        self.presentation.set_text(DisplayTarget::Prompt, "Welcome! Choose a game mode");

        self.request_categories();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            game_mode: self.game_mode,
            mode: self.mode,
            generation: self.generation,
            current_round: self.current_round,
            difficulty: self.round_difficulty,
            categories_ready: self.categories_ready,
            pool_sizes: [
                self.pools.easy.len(),
                self.pools.medium.len(),
                self.pools.hard.len(),
            ],
            category_options: self.category_options.clone(),
            round_category: self.round_category.clone(),
            question_number: self.current_question_index.map(|i| i + 1),
            question_count: self.loaded_questions.len(),
            question: self
                .current_question
                .as_ref()
                .map(|q| q.question.question.clone()),
            answers: self.current_question.as_ref().map(|q| q.answers.clone()),
            selected_answer: self.selected_answer,
            answer_lock: self.answer_lock,
            answers_open: self.answers_open,
            scores_on_screen: self.scores_on_screen,
            buzz_winner: self.buzz_winner,
            podiums: self.podiums.clone(),
            players: self.players.clone(),
            host: self.host.clone(),
            moderator: self.registry.moderator().cloned(),
            participants: self.registry.len(),
            load_state: self.load_state.clone(),
            winner: self.winner.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::presentation::RecordingBridge;

    pub fn question(category_id: CategoryId, n: usize) -> Question {
        Question {
            id: format!("q{}-{}", category_id, n),
            category_id,
            category: format!("Category {}", category_id),
            difficulty: Difficulty::Easy,
            question: format!("Question {}?", n),
            answer: format!("right {}", n),
            incorrect: [
                format!("wrong {}a", n),
                format!("wrong {}b", n),
                format!("wrong {}c", n),
            ],
        }
    }

    pub fn questions(category_id: CategoryId, count: usize) -> Vec<Question> {
        (0..count).map(|n| question(category_id, n)).collect()
    }

    pub fn count(id: CategoryId, easy: u32, medium: u32, hard: u32) -> CategoryCount {
        CategoryCount {
            category: Category {
                id,
                name: format!("Category {}", id),
            },
            easy,
            medium,
            hard,
        }
    }

    /// Session with category pools loaded and the given participants joined in order
    pub fn session_with(
        game_mode: GameMode,
        counts: Vec<CategoryCount>,
        participants: &[&str],
    ) -> (Session, RecordingBridge) {
        let bridge = RecordingBridge::new();
        let mut session = Session::new(QuizConfig::default(), Arc::new(bridge.clone()));
        session.game_mode = game_mode;

        let effects = session.take_effects();
        let ticket = match effects.as_slice() {
            [Effect::LoadCategories { ticket, .. }] => *ticket,
            other => panic!("unexpected effects {:?}", other),
        };
        session.on_categories_loaded(0, ticket, Ok(counts));

        for p in participants {
            session.join(Participant::new(*p, p.to_uppercase()));
        }
        (session, bridge)
    }

    /// The single question load request among the pending effects
    pub fn pending_load(session: &mut Session) -> (u64, CategoryId, usize) {
        session
            .take_effects()
            .into_iter()
            .find_map(|e| match e {
                Effect::LoadQuestions {
                    ticket,
                    category,
                    count,
                    ..
                } => Some((ticket, category, count)),
                _ => None,
            })
            .expect("no question load requested")
    }

    pub fn id(s: &str) -> ParticipantId {
        s.to_string()
    }
}
