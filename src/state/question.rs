use rand::Rng;
use serde::Serialize;

use super::{Session, TimerKind};
use crate::presentation::{DisplayTarget, HighlightTarget, PresentationExt, Sound};
use crate::types::*;

/// Fisher–Yates shuffle in place
pub fn shuffle<T>(items: &mut [T]) {
    let mut rng = rand::rng();
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// A question with its answers in presentation order
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PresentedQuestion {
    pub question: Question,
    pub answers: [String; ANSWER_COUNT],
    pub correct_index: usize,
}

impl PresentedQuestion {
    pub fn new(question: Question) -> Self {
        let mut order: [usize; ANSWER_COUNT] = [0, 1, 2, 3];
        shuffle(&mut order);

        let texts = question.answers();
        let answers = order.map(|i| texts[i].clone());
        // Slot 0 of `texts` is the correct answer
        let correct_index = order.iter().position(|&i| i == 0).unwrap_or(0);

        Self {
            question,
            answers,
            correct_index,
        }
    }
}

impl Session {
    /// Put question `index` of the loaded batch on screen and reset per-question state
    pub fn display_question(&mut self, index: usize) {
        let Some(question) = self.loaded_questions.get(index).cloned() else {
            tracing::warn!(
                "No question {} in a batch of {}",
                index,
                self.loaded_questions.len()
            );
            return;
        };

        let presented = PresentedQuestion::new(question);
        tracing::info!(
            "Round {} question {}/{}: {} (correct slot {})",
            self.current_round,
            index + 1,
            self.loaded_questions.len(),
            presented.question.question,
            presented.correct_index
        );

        let text = match self.game_mode {
            GameMode::Timed => format!("{}: {}", index + 1, presented.question.question),
            GameMode::HostModerated => presented.question.question.clone(),
        };
        self.presentation.set_text(DisplayTarget::Question, text);
        for (i, answer) in presented.answers.iter().enumerate() {
            self.presentation
                .set_text(DisplayTarget::Answer(i), answer.as_str());
            self.presentation
                .set_highlight(HighlightTarget::Answer(i), ColorState::Neutral);
        }

        self.current_question_index = Some(index);
        self.current_question = Some(presented);
        self.selected_answer = None;
        self.answer_lock = AnswerLock::Unlocked;
        self.driver_selected = false;
        self.answers_open = false;
        self.answer_deadline = None;
        self.buzz_winner = None;
        self.mode = Mode::Question;

        match self.game_mode {
            GameMode::HostModerated => {
                for i in 0..self.podiums.len() {
                    self.podiums[i].has_buzzed = false;
                    self.set_button(i, ColorState::Available);
                    self.presentation
                        .set_highlight(HighlightTarget::PodiumStripes(i), ColorState::Neutral);
                    self.presentation
                        .set_highlight(HighlightTarget::PodiumPanels(i), ColorState::Neutral);
                }
                self.presentation.set_camera_focus(None);
                self.presentation
                    .set_highlight(HighlightTarget::ScreenBorder, ColorState::Neutral);
            }
            GameMode::Timed => {
                for player in &mut self.players {
                    player.answered = false;
                    player.answer = None;
                    player.time_to_answer = 0.0;
                    self.presentation.set_highlight(
                        HighlightTarget::PlayerIcon(player.id.clone()),
                        ColorState::Neutral,
                    );
                }
            }
        }
    }

    /// Toggle the highlighted answer slot. Pressing the selected slot again
    /// without `lock` clears it. Returns the resulting selection.
    pub fn select_answer(
        &mut self,
        index: Option<usize>,
        preview: bool,
        lock: bool,
    ) -> Option<usize> {
        self.selected_answer = if self.selected_answer == index && !lock {
            None
        } else {
            index
        };

        let color = if preview || lock {
            ColorState::Preview
        } else {
            ColorState::Selected
        };
        for i in 0..ANSWER_COUNT {
            let c = if Some(i) == self.selected_answer {
                color
            } else {
                ColorState::Neutral
            };
            self.presentation
                .set_highlight(HighlightTarget::Answer(i), c);
        }

        self.selected_answer
    }

    /// Color the answers and score them. Returns whether the claimed selection was correct.
    pub fn reveal_answer(&mut self) -> bool {
        let Some(correct) = self.current_question.as_ref().map(|q| q.correct_index) else {
            return false;
        };

        for i in 0..ANSWER_COUNT {
            let color = if i == correct {
                ColorState::Correct
            } else if Some(i) == self.selected_answer {
                ColorState::Incorrect
            } else {
                ColorState::Neutral
            };
            self.presentation
                .set_highlight(HighlightTarget::Answer(i), color);
        }

        let was_correct = self.selected_answer == Some(correct);
        self.answers_open = false;
        self.mode = Mode::Reveal;
        tracing::info!(
            "Revealed answer {} (claimed {:?}, correct: {})",
            correct,
            self.selected_answer,
            was_correct
        );

        if self.game_mode == GameMode::Timed {
            self.score_players(correct);
        }

        was_correct
    }

    /// Timed scoring: +100 plus a speed bonus for a right answer, -100 for a wrong one
    fn score_players(&mut self, correct: usize) {
        let mut any_right = false;
        for player in &mut self.players {
            let Some(answer) = player.answer.filter(|_| player.answered) else {
                continue;
            };

            let delta = if answer == correct {
                any_right = true;
                100 + (player.time_to_answer * 10.0).round() as i64
            } else {
                -100
            };
            player.score = player.score.saturating_add(delta);
            tracing::debug!(
                "Player {} answered {} with {:.1}s left: {:+} (now {})",
                player.name,
                answer,
                player.time_to_answer,
                delta,
                player.score
            );

            self.presentation.set_text(
                DisplayTarget::PlayerDelta(player.id.clone()),
                format!("{:+}", delta),
            );
            self.presentation.set_highlight(
                HighlightTarget::PlayerIcon(player.id.clone()),
                if delta > 0 {
                    ColorState::Correct
                } else {
                    ColorState::Incorrect
                },
            );
        }

        self.presentation
            .play_sound(if any_right { Sound::Correct } else { Sound::Wrong });

        if let Some(question) = self.current_question_index {
            let round = self.current_round;
            self.schedule(
                self.config.highlight_clear,
                TimerKind::ClearPlayerHighlights { round, question },
            );
        }
    }

    pub(crate) fn clear_player_highlights(&mut self, round: u32, question: usize) {
        if round != self.current_round || Some(question) != self.current_question_index {
            return;
        }
        for player in &self.players {
            self.presentation
                .set_text(DisplayTarget::PlayerDelta(player.id.clone()), "");
            self.presentation.set_highlight(
                HighlightTarget::PlayerIcon(player.id.clone()),
                ColorState::Neutral,
            );
        }
    }
}
