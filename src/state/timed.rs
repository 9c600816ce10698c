//! Countdown-driven flow of timed mass-participation games

use std::time::Duration;
use tokio::time::Instant;

use super::{Session, TimerKind};
use crate::presentation::{DisplayTarget, PresentationExt, Sound};
use crate::types::*;

const TICK: Duration = Duration::from_secs(1);

impl Session {
    /// Start Game control in the title menu
    pub fn start_game(&mut self, actor: &ParticipantId) {
        if self.game_mode != GameMode::Timed
            || self.mode != Mode::Title
            || !self.registry.is_privileged(actor)
        {
            return;
        }
        if self.players.is_empty() {
            self.presentation
                .notify(actor, "At least one player must join before starting.");
            return;
        }
        if !self.categories_ready {
            if matches!(self.load_state, LoadState::Failed { .. }) {
                tracing::info!("Retrying category load");
                self.request_categories();
            }
            self.presentation
                .notify(actor, "Questions are still loading, try again shortly.");
            return;
        }

        tracing::info!("Starting timed game with {} players", self.players.len());
        self.presentation.set_text(DisplayTarget::Prompt, "");
        self.start_round(self.next_round_difficulty(), self.config.questions_per_round);
    }

    /// Round banner is up; the first question follows after the intro window
    pub(crate) fn announce_round(&mut self) {
        let count = self.loaded_questions.len();
        self.presentation.set_text(
            DisplayTarget::RoundQuestionCount,
            format!("{} Question{}", count, if count == 1 { "" } else { "s" }),
        );
        self.schedule(self.config.round_intro, TimerKind::RoundIntroElapsed);
    }

    /// Scoreboard control: next round while hard categories remain, otherwise the end
    pub fn next_round(&mut self, actor: &ParticipantId) {
        if self.game_mode != GameMode::Timed
            || self.mode != Mode::Scores
            || !self.registry.is_privileged(actor)
        {
            return;
        }
        self.hide_scores();
        if self.pools.is_empty(Difficulty::Hard) {
            self.end_game();
        } else {
            self.start_round(self.next_round_difficulty(), self.config.questions_per_round);
        }
    }

    pub(crate) fn handle_timer(&mut self, timer: TimerKind, now: Instant) {
        if let TimerKind::ClearPlayerHighlights { round, question } = timer {
            self.clear_player_highlights(round, question);
            return;
        }
        if self.game_mode != GameMode::Timed {
            return;
        }

        match timer {
            TimerKind::RoundIntroElapsed => {
                if self.mode == Mode::Question
                    && self.current_question_index.is_none()
                    && !self.loaded_questions.is_empty()
                {
                    self.display_question(0);
                    self.schedule(self.config.display_window, TimerKind::OpenAnswers);
                }
            }
            TimerKind::OpenAnswers => {
                if self.mode == Mode::Question
                    && self.current_question.is_some()
                    && !self.answers_open
                {
                    self.open_answers(now);
                }
            }
            TimerKind::CountdownTick { remaining } => {
                if self.mode == Mode::Question && self.answers_open {
                    self.countdown(remaining);
                }
            }
            TimerKind::NextQuestion => {
                if self.mode == Mode::Reveal {
                    let next = self.current_question_index.map_or(0, |i| i + 1);
                    self.display_question(next);
                    self.schedule(self.config.display_window, TimerKind::OpenAnswers);
                }
            }
            TimerKind::ShowRoundScores => {
                if self.mode == Mode::Reveal {
                    self.mode = Mode::Scores;
                    self.show_scores();
                    let prompt = if self.pools.is_empty(Difficulty::Hard) {
                        "End Game"
                    } else {
                        "Next Round | End Game"
                    };
                    self.presentation.set_text(DisplayTarget::Prompt, prompt);
                    tracing::info!("Round {} finished", self.current_round);
                }
            }
            TimerKind::ClearPlayerHighlights { .. } => {}
        }
    }

    fn open_answers(&mut self, now: Instant) {
        let secs = self.config.answer_window.as_secs().max(1);
        self.answers_open = true;
        self.answer_deadline = Some(now + Duration::from_secs(secs));
        tracing::debug!("Answers open for {}s", secs);

        self.presentation
            .set_text(DisplayTarget::Countdown, secs.to_string());
        self.schedule(TICK, TimerKind::CountdownTick { remaining: secs - 1 });
    }

    fn countdown(&mut self, remaining: u64) {
        self.presentation
            .set_text(DisplayTarget::Countdown, remaining.to_string());
        if remaining > 0 {
            if remaining <= 3 {
                self.presentation.play_sound(Sound::TickTock);
            }
            self.schedule(TICK, TimerKind::CountdownTick {
                remaining: remaining - 1,
            });
            return;
        }

        self.answer_deadline = None;
        self.reveal_answer();
        self.presentation.set_text(DisplayTarget::Countdown, "");

        let next = self.current_question_index.map_or(0, |i| i + 1);
        if next < self.loaded_questions.len() {
            self.schedule(self.config.reveal_window, TimerKind::NextQuestion);
        } else {
            self.schedule(self.config.scoreboard_pause, TimerKind::ShowRoundScores);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::protocol::ClientMessage;
    use crate::state::Effect;

    fn timers(session: &mut Session) -> Vec<(Duration, TimerKind)> {
        session
            .take_effects()
            .into_iter()
            .filter_map(|e| match e {
                Effect::Schedule { after, timer, .. } => Some((after, timer)),
                _ => None,
            })
            .collect()
    }

    /// Timed game with players "a" and "b", round 1 loaded with `n` questions
    fn started(n: usize) -> (Session, crate::presentation::RecordingBridge) {
        let (mut session, bridge) = session_with(
            GameMode::Timed,
            vec![count(1, 12, 0, 0), count(2, 11, 0, 0), count(3, 0, 0, 12)],
            &["a", "b"],
        );
        let now = Instant::now();
        session.handle_client_message(&id("a"), ClientMessage::JoinGame, now);
        session.handle_client_message(&id("b"), ClientMessage::JoinGame, now);
        session.handle_client_message(&id("a"), ClientMessage::StartGame, now);
        let (ticket, category, _) = pending_load(&mut session);
        session.on_questions_loaded(0, ticket, Ok(questions(category, n)));
        (session, bridge)
    }

    #[test]
    fn test_start_game_needs_players_and_privilege() {
        let (mut session, bridge) =
            session_with(GameMode::Timed, vec![count(1, 12, 0, 0)], &["a", "b"]);
        let now = Instant::now();

        session.handle_client_message(&id("a"), ClientMessage::StartGame, now);
        assert_eq!(session.mode, Mode::Title);
        assert!(bridge.notices().iter().any(|(to, _)| to == "a"));

        session.handle_client_message(&id("b"), ClientMessage::JoinGame, now);
        session.handle_client_message(&id("b"), ClientMessage::StartGame, now);
        assert_eq!(session.mode, Mode::Title);

        session.handle_client_message(&id("a"), ClientMessage::StartGame, now);
        assert_eq!(session.mode, Mode::Question);
        assert_eq!(session.current_round, 1);
    }

    #[test]
    fn test_round_intro_then_question() {
        let (mut session, bridge) = started(2);
        assert_eq!(
            bridge.last_text(&DisplayTarget::RoundQuestionCount),
            Some("2 Questions".to_string())
        );
        assert_eq!(
            timers(&mut session),
            vec![(Duration::from_secs(5), TimerKind::RoundIntroElapsed)]
        );

        session.on_timer(0, TimerKind::RoundIntroElapsed, Instant::now());
        assert_eq!(session.current_question_index, Some(0));
        assert!(!session.answers_open);
        assert_eq!(
            timers(&mut session),
            vec![(Duration::from_millis(2000), TimerKind::OpenAnswers)]
        );
    }

    #[test]
    fn test_full_question_cycle() {
        let (mut session, bridge) = started(2);
        let start = Instant::now();
        session.on_timer(0, TimerKind::RoundIntroElapsed, start);
        session.on_timer(0, TimerKind::OpenAnswers, start);
        assert!(session.answers_open);
        assert_eq!(bridge.last_text(&DisplayTarget::Countdown), Some("10".to_string()));
        timers(&mut session);

        let correct = session.current_question.as_ref().unwrap().correct_index;
        session.handle_client_message(
            &id("a"),
            ClientMessage::SelectAnswer { index: correct },
            start + Duration::from_secs(5),
        );
        session.handle_client_message(
            &id("b"),
            ClientMessage::SelectAnswer {
                index: (correct + 1) % ANSWER_COUNT,
            },
            start + Duration::from_secs(6),
        );

        for remaining in (0..10).rev() {
            session.on_timer(0, TimerKind::CountdownTick { remaining }, start);
        }
        assert_eq!(session.mode, Mode::Reveal);
        assert_eq!(session.player(&id("a")).unwrap().score, 150);
        assert_eq!(session.player(&id("b")).unwrap().score, -100);
        assert!(timers(&mut session)
            .iter()
            .any(|(after, t)| *t == TimerKind::NextQuestion && *after == Duration::from_secs(5)));

        // Late answers are ignored
        assert!(!session.submit_answer(&id("a"), correct, start));

        session.on_timer(0, TimerKind::NextQuestion, start);
        assert_eq!(session.current_question_index, Some(1));
        assert!(!session.player(&id("a")).unwrap().answered);
    }

    #[test]
    fn test_last_question_leads_to_scores() {
        let (mut session, bridge) = started(1);
        let now = Instant::now();
        session.on_timer(0, TimerKind::RoundIntroElapsed, now);
        session.on_timer(0, TimerKind::OpenAnswers, now);
        session.answers_open = true;
        session.on_timer(0, TimerKind::CountdownTick { remaining: 0 }, now);

        assert!(timers(&mut session)
            .iter()
            .any(|(after, t)| {
                *t == TimerKind::ShowRoundScores && *after == Duration::from_secs(3)
            }));

        session.on_timer(0, TimerKind::ShowRoundScores, now);
        assert_eq!(session.mode, Mode::Scores);
        assert!(session.scores_on_screen);
        assert_eq!(
            bridge.last_text(&DisplayTarget::Prompt),
            Some("Next Round | End Game".to_string())
        );
    }

    #[test]
    fn test_next_round_and_end_game() {
        let (mut session, _) = started(1);
        session.mode = Mode::Scores;

        // Only the moderator picks
        session.next_round(&id("b"));
        assert_eq!(session.mode, Mode::Scores);

        session.next_round(&id("a"));
        assert_eq!(session.current_round, 2);
        assert_eq!(session.mode, Mode::Question);
        let (ticket, category, _) = pending_load(&mut session);
        session.on_questions_loaded(0, ticket, Ok(questions(category, 1)));

        // No hard categories left
        session.pools.hard.clear();
        session.mode = Mode::Scores;
        session.next_round(&id("a"));
        assert_eq!(session.mode, Mode::GameOver);
    }

    #[test]
    fn test_timers_ignored_out_of_phase() {
        let (mut session, _) = started(1);
        session.on_timer(0, TimerKind::NextQuestion, Instant::now());
        session.on_timer(0, TimerKind::CountdownTick { remaining: 0 }, Instant::now());
        assert_eq!(session.mode, Mode::Question);
        assert_eq!(session.current_question_index, None);
    }
}
