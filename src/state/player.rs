use tokio::time::Instant;

use super::Session;
use crate::presentation::{DisplayTarget, HighlightTarget, PresentationExt};
use crate::types::*;

impl Session {
    /// Register the pressing user as a timed-mode player (once per user)
    pub fn join_game(&mut self, participant: &ParticipantId) {
        if self.game_mode != GameMode::Timed || self.mode != Mode::Title {
            return;
        }
        if self.players.iter().any(|p| &p.id == participant) {
            return;
        }

        let name = self
            .registry
            .get(participant)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| participant.clone());
        let color = PLAYER_COLORS[self.players.len() % PLAYER_COLORS.len()].to_string();

        tracing::info!("{} joined the game as player #{}", name, self.players.len() + 1);
        self.players
            .push(Player::new(participant.clone(), name, color));

        let count = self.players.len();
        self.presentation.set_text(
            DisplayTarget::PlayerCount,
            format!("{} Player{}", count, if count == 1 { "" } else { "s" }),
        );
    }

    pub fn player(&self, participant: &ParticipantId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == participant)
    }

    /// Record a timed-mode answer. Only the first answer per question counts.
    pub fn submit_answer(
        &mut self,
        participant: &ParticipantId,
        index: usize,
        now: Instant,
    ) -> bool {
        if self.game_mode != GameMode::Timed
            || self.mode != Mode::Question
            || !self.answers_open
            || index >= ANSWER_COUNT
        {
            return false;
        }
        let remaining = self
            .answer_deadline
            .map(|deadline| deadline.saturating_duration_since(now).as_secs_f64())
            .unwrap_or(0.0);

        let Some(player) = self.players.iter_mut().find(|p| &p.id == participant) else {
            return false;
        };
        if player.answered {
            tracing::debug!("Ignoring repeat answer from {}", player.name);
            return false;
        }

        player.answered = true;
        player.answer = Some(index);
        player.time_to_answer = remaining;
        tracing::debug!("{} answered {} with {:.1}s left", player.name, index, remaining);

        self.presentation.set_highlight(
            HighlightTarget::PlayerIcon(participant.clone()),
            ColorState::Answered,
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use std::time::Duration;

    fn open_question(session: &mut Session, now: Instant) {
        session.loaded_questions = questions(1, 1);
        session.display_question(0);
        session.answers_open = true;
        session.answer_deadline = Some(now + Duration::from_secs(10));
    }

    #[test]
    fn test_join_game_once_per_user() {
        let (mut session, bridge) = session_with(GameMode::Timed, vec![], &["a", "b"]);

        session.join_game(&id("a"));
        session.join_game(&id("a"));
        session.join_game(&id("b"));

        assert_eq!(session.players.len(), 2);
        assert_ne!(session.players[0].color, session.players[1].color);
        assert_eq!(
            bridge.last_text(&DisplayTarget::PlayerCount),
            Some("2 Players".to_string())
        );
    }

    #[test]
    fn test_join_game_only_in_title_of_timed_mode() {
        let (mut session, _) = session_with(GameMode::HostModerated, vec![], &["a"]);
        session.join_game(&id("a"));
        assert!(session.players.is_empty());

        session.game_mode = GameMode::Timed;
        session.mode = Mode::Question;
        session.join_game(&id("a"));
        assert!(session.players.is_empty());
    }

    #[test]
    fn test_second_answer_is_ignored() {
        let (mut session, _) = session_with(GameMode::Timed, vec![], &["a"]);
        session.join_game(&id("a"));
        let start = Instant::now();
        open_question(&mut session, start);
        let correct = session.current_question.as_ref().unwrap().correct_index;
        let wrong = (correct + 1) % ANSWER_COUNT;

        assert!(session.submit_answer(&id("a"), correct, start + Duration::from_secs(3)));
        assert!(!session.submit_answer(&id("a"), wrong, start + Duration::from_secs(4)));

        let player = session.player(&id("a")).unwrap();
        assert_eq!(player.answer, Some(correct));
        assert_eq!(player.time_to_answer, 7.0);

        // Scored on the first pick and its time
        session.reveal_answer();
        assert_eq!(session.player(&id("a")).unwrap().score, 170);
    }

    #[test]
    fn test_answer_outside_window_is_ignored() {
        let (mut session, _) = session_with(GameMode::Timed, vec![], &["a", "b"]);
        session.join_game(&id("a"));
        let now = Instant::now();
        open_question(&mut session, now);

        // Not a player
        assert!(!session.submit_answer(&id("b"), 0, now));

        session.answers_open = false;
        assert!(!session.submit_answer(&id("a"), 0, now));
        assert!(!session.player(&id("a")).unwrap().answered);
    }
}
