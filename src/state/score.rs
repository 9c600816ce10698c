use super::Session;
use crate::presentation::{DisplayTarget, HighlightTarget, PresentationExt, Sound};
use crate::types::*;

/// Ranked list, one "rank: name – score" line per entry
pub fn format_scoreboard(entries: &[ScoreEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{}: {} – {}", i + 1, e.name, e.score))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Session {
    /// Players then occupied podiums, in that iteration order
    fn score_entries(&self) -> Vec<ScoreEntry> {
        let players = self.players.iter().map(|p| ScoreEntry {
            participant: p.id.clone(),
            name: p.name.clone(),
            score: p.score,
        });
        let podiums = self.podiums.iter().filter_map(|p| {
            p.occupant.as_ref().map(|id| ScoreEntry {
                participant: id.clone(),
                name: p.display_name.clone(),
                score: p.score,
            })
        });
        players.chain(podiums).collect()
    }

    /// Merged scores, highest first; ties keep iteration order
    pub fn leaderboard(&self) -> Vec<ScoreEntry> {
        let mut entries = self.score_entries();
        // sort_by is stable
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries
    }

    pub fn show_scores(&mut self) {
        let text = format_scoreboard(&self.leaderboard());
        self.scores_on_screen = true;
        self.presentation.set_text(DisplayTarget::Scoreboard, text);
    }

    pub fn hide_scores(&mut self) {
        if self.scores_on_screen {
            self.scores_on_screen = false;
            self.presentation.set_text(DisplayTarget::Scoreboard, "");
        }
    }

    pub fn toggle_scores(&mut self) {
        if self.scores_on_screen {
            self.hide_scores();
        } else {
            self.show_scores();
        }
    }

    /// Crown the first participant holding the top score and offer a way back to the title
    pub fn end_game(&mut self) {
        let entries = self.score_entries();
        let best = entries.iter().map(|e| e.score).max();
        let winner = best.and_then(|max| entries.iter().find(|e| e.score == max));

        self.mode = Mode::GameOver;
        self.answers_open = false;
        self.answer_deadline = None;
        self.show_scores();

        match winner {
            Some(w) => {
                tracing::info!("Game over, {} wins with {}", w.name, w.score);
                self.winner = Some(w.participant.clone());
                self.presentation
                    .set_text(DisplayTarget::Winner, format!("{} wins!", w.name));
                self.presentation.set_highlight(
                    HighlightTarget::Crown(w.participant.clone()),
                    ColorState::Winner,
                );
            }
            None => {
                tracing::info!("Game over with nobody playing");
                self.winner = None;
                self.presentation.set_text(DisplayTarget::Winner, "No winner");
            }
        }
        self.presentation.play_sound(Sound::Correct);
        self.presentation
            .set_text(DisplayTarget::Prompt, "Back to Menu");
    }

    /// End Game control: ends a running game, or returns to the title from the winner screen
    pub(crate) fn press_end_game(&mut self, actor: &ParticipantId) {
        if !self.can_drive(actor) {
            return;
        }
        match self.mode {
            Mode::Title => {}
            Mode::GameOver => self.reset(),
            _ => self.end_game(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn entry(name: &str, score: i64) -> ScoreEntry {
        ScoreEntry {
            participant: name.to_lowercase(),
            name: name.to_string(),
            score,
        }
    }

    #[test]
    fn test_format_scoreboard() {
        let text = format_scoreboard(&[entry("Alice", 250), entry("Bob", -100)]);
        assert_eq!(text, "1: Alice – 250\n2: Bob – -100");
        assert_eq!(format_scoreboard(&[]), "");
    }

    #[test]
    fn test_leaderboard_merges_and_keeps_tie_order() {
        let (mut session, _) = session_with(GameMode::Timed, vec![], &["a", "b", "c"]);
        session.players.push(Player::new(id("a"), "A".into(), "#1".into()));
        session.players.push(Player::new(id("b"), "B".into(), "#2".into()));
        session.players[0].score = 100;
        session.players[1].score = 300;

        session.podiums[2].occupant = Some(id("c"));
        session.podiums[2].display_name = "C".into();
        session.podiums[2].score = 100;

        let names: Vec<_> = session.leaderboard().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_end_game_first_max_wins() {
        let (mut session, bridge) = session_with(GameMode::Timed, vec![], &["a", "b"]);
        session.players.push(Player::new(id("a"), "A".into(), "#1".into()));
        session.players.push(Player::new(id("b"), "B".into(), "#2".into()));
        session.players[0].score = 200;
        session.players[1].score = 200;

        session.end_game();
        assert_eq!(session.mode, Mode::GameOver);
        assert_eq!(session.winner, Some(id("a")));
        assert_eq!(
            bridge.last_text(&DisplayTarget::Winner),
            Some("A wins!".to_string())
        );
        assert_eq!(
            bridge.last_highlight(&HighlightTarget::Crown(id("a"))),
            Some(ColorState::Winner)
        );
    }

    #[test]
    fn test_end_game_without_players() {
        let (mut session, _) = session_with(GameMode::Timed, vec![], &[]);
        session.end_game();
        assert_eq!(session.mode, Mode::GameOver);
        assert_eq!(session.winner, None);
    }

    #[test]
    fn test_end_game_twice_returns_to_title() {
        let (mut session, _) = session_with(GameMode::Timed, vec![], &["a"]);
        session.press_end_game(&id("a"));
        assert_eq!(session.mode, Mode::Title);

        session.mode = Mode::Scores;
        session.press_end_game(&id("a"));
        assert_eq!(session.mode, Mode::GameOver);

        session.press_end_game(&id("a"));
        assert_eq!(session.mode, Mode::Title);
        assert_eq!(session.generation, 1);
        assert!(!session.scores_on_screen);
    }

    #[test]
    fn test_toggle_scores() {
        let (mut session, bridge) = session_with(GameMode::HostModerated, vec![], &["a"]);
        session.join_podium(0, &id("a"));
        session.adjust_score(0, 2);

        session.toggle_scores();
        assert!(session.scores_on_screen);
        assert_eq!(
            bridge.last_text(&DisplayTarget::Scoreboard),
            Some("1: A – 2".to_string())
        );

        session.toggle_scores();
        assert!(!session.scores_on_screen);
        assert_eq!(bridge.last_text(&DisplayTarget::Scoreboard), Some(String::new()));
    }
}
