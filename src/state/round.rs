use super::Session;
use crate::presentation::{DisplayTarget, HighlightTarget, PresentationExt, Sound};
use crate::repository::RepoResult;
use crate::types::*;

impl Session {
    /// Start a round on a random unused category of `difficulty`.
    /// The pool must be non-empty; an empty one ends the game.
    pub fn start_round(&mut self, difficulty: Difficulty, count: usize) {
        let Some(category) = self.pools.pick_random(difficulty) else {
            tracing::info!("No {} categories remain, ending game", difficulty);
            self.end_game();
            return;
        };

        self.current_round += 1;
        self.mode = match self.game_mode {
            GameMode::Timed => Mode::Question,
            GameMode::HostModerated => Mode::CategorySelect,
        };
        self.presentation.set_text(
            DisplayTarget::RoundTitle,
            format!("Round {}: {}", self.current_round, difficulty.label()),
        );
        self.load_round_category(category, difficulty, count);
    }

    /// Consume `category` for the current round and request its questions
    fn load_round_category(&mut self, category: Category, difficulty: Difficulty, count: usize) {
        tracing::info!(
            "Round {}: loading {} {} questions from {} ({})",
            self.current_round,
            count,
            difficulty,
            category.name,
            category.id
        );
        self.pools.remove_category(category.id);
        self.presentation
            .set_text(DisplayTarget::RoundCategory, category.name.as_str());

        self.round_difficulty = difficulty;
        self.loaded_questions.clear();
        self.current_question_index = None;
        self.current_question = None;
        self.request_questions(category.id, difficulty, count);
        self.round_category = Some(category);
    }

    /// Next round of a host-moderated game: offer categories of the new difficulty
    pub fn begin_category_selection(&mut self) {
        let difficulty = self.next_round_difficulty();
        if self.pools.is_empty(difficulty) {
            tracing::info!("No {} categories remain, ending game", difficulty);
            self.end_game();
            return;
        }

        self.current_round += 1;
        self.round_difficulty = difficulty;
        self.mode = Mode::CategorySelect;
        self.current_question_index = None;
        self.current_question = None;
        self.buzz_winner = None;
        self.answer_lock = AnswerLock::Unlocked;
        self.driver_selected = false;
        tracing::info!("Round {} ({}): category selection", self.current_round, difficulty);

        // Nobody buzzes while a category is being picked
        for i in 0..self.podiums.len() {
            self.podiums[i].has_buzzed = true;
            self.set_button(i, ColorState::Locked);
        }
        self.presentation.set_camera_focus(None);
        self.presentation.set_text(
            DisplayTarget::RoundTitle,
            format!("Round {}: {}", self.current_round, difficulty.label()),
        );
        self.present_category_options();
    }

    fn present_category_options(&mut self) {
        self.category_options = self.pools.options(self.round_difficulty);
        self.selected_answer = None;

        self.presentation
            .set_text(DisplayTarget::Question, "Select a category");
        for i in 0..ANSWER_COUNT {
            let name = self
                .category_options
                .get(i)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            self.presentation.set_text(DisplayTarget::Answer(i), name);
            self.presentation
                .set_highlight(HighlightTarget::Answer(i), ColorState::Neutral);
        }
    }

    /// Load the selected category, or reshuffle the offer when nothing is selected
    pub fn advance_category_selection(&mut self) {
        if self.is_loading() {
            return;
        }
        match self
            .selected_answer
            .and_then(|i| self.category_options.get(i).cloned())
        {
            Some(category) => {
                let count = self.config.questions_per_round;
                self.load_round_category(category, self.round_difficulty, count);
            }
            None => {
                tracing::debug!("No category selected, reshuffling");
                if self.pools.is_empty(self.round_difficulty) {
                    self.end_game();
                } else {
                    self.present_category_options();
                }
            }
        }
    }

    /// Continuation of a question load; stale or superseded batches are dropped
    pub fn on_questions_loaded(
        &mut self,
        generation: u64,
        ticket: u64,
        result: RepoResult<Vec<Question>>,
    ) {
        if !self.accepts(generation, ticket) {
            tracing::debug!(
                "Discarding stale question batch (generation {}, ticket {})",
                generation,
                ticket
            );
            return;
        }
        let expected_mode = match self.game_mode {
            GameMode::Timed => Mode::Question,
            GameMode::HostModerated => Mode::CategorySelect,
        };
        if self.mode != expected_mode {
            tracing::debug!("Discarding question batch that arrived in {:?}", self.mode);
            self.load_state = LoadState::Idle;
            return;
        }

        let questions = match result {
            Ok(questions) => questions,
            Err(e) => {
                tracing::error!("Failed to load questions: {}", e);
                self.fail_load(format!("Cannot continue: questions unavailable ({})", e));
                return;
            }
        };
        self.load_state = LoadState::Idle;

        if questions.is_empty() {
            tracing::warn!("Category returned no questions, picking another");
            match self.game_mode {
                GameMode::Timed => {
                    self.current_round -= 1;
                    self.start_round(self.round_difficulty, self.config.questions_per_round);
                }
                GameMode::HostModerated => self.advance_category_selection_after_shortage(),
            }
            return;
        }
        if questions.len() < self.config.questions_per_round {
            tracing::warn!(
                "Short batch: {} of {} questions, round continues with fewer",
                questions.len(),
                self.config.questions_per_round
            );
        }

        self.loaded_questions = questions;
        match self.game_mode {
            GameMode::Timed => self.announce_round(),
            GameMode::HostModerated => self.display_question(0),
        }
    }

    fn advance_category_selection_after_shortage(&mut self) {
        self.selected_answer = None;
        if self.pools.is_empty(self.round_difficulty) {
            self.end_game();
        } else {
            self.present_category_options();
        }
    }

    /// Host-moderated "next" control
    pub fn advance(&mut self, actor: &ParticipantId) {
        if !self.can_drive(actor) || self.game_mode != GameMode::HostModerated {
            return;
        }
        if self.scores_on_screen {
            self.hide_scores();
            return;
        }

        match self.mode {
            Mode::Title => {
                if self.categories_ready {
                    self.begin_category_selection();
                } else if matches!(self.load_state, LoadState::Failed { .. }) {
                    tracing::info!("Retrying category load");
                    self.request_categories();
                }
            }
            Mode::CategorySelect => self.advance_category_selection(),
            Mode::Question | Mode::Reveal => self.tally_and_advance(),
            Mode::Scores | Mode::GameOver => {}
        }
    }

    /// Reveal and score an open question, or move past a revealed one
    pub fn tally_and_advance(&mut self) {
        match self.mode {
            Mode::Question => {
                let correct = self.reveal_answer();
                if self.game_mode != GameMode::HostModerated {
                    return;
                }
                if let Some(winner) = self.buzz_winner {
                    let podium = &mut self.podiums[winner];
                    podium.score = podium.score.saturating_add(if correct { 1 } else { -1 });
                    let score = podium.score;
                    tracing::info!(
                        "Podium {} answered {}: now {}",
                        winner,
                        if correct { "right" } else { "wrong" },
                        score
                    );

                    self.presentation
                        .set_text(DisplayTarget::PodiumScore(winner), score.to_string());
                    let color = if correct {
                        ColorState::Correct
                    } else {
                        ColorState::Incorrect
                    };
                    self.presentation
                        .set_highlight(HighlightTarget::PodiumStripes(winner), color);
                    self.presentation
                        .play_sound(if correct { Sound::Correct } else { Sound::Wrong });
                }
                for i in 0..self.podiums.len() {
                    if Some(i) != self.buzz_winner {
                        self.set_button(i, ColorState::Locked);
                    }
                }
                self.presentation.set_camera_focus(None);
            }
            Mode::Reveal => {
                self.buzz_winner = None;
                self.answer_lock = AnswerLock::Unlocked;
                self.presentation
                    .set_highlight(HighlightTarget::ScreenBorder, ColorState::Neutral);

                let next = self.current_question_index.map_or(0, |i| i + 1);
                if next < self.loaded_questions.len() {
                    self.display_question(next);
                } else {
                    self.begin_category_selection();
                }
            }
            _ => {}
        }
    }
}
