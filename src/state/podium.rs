use super::Session;
use crate::presentation::{DisplayTarget, HighlightTarget, PresentationExt, Sound};
use crate::types::*;

/// Podium name plate text: long names are cut and marked with "..."
pub fn podium_display_name(name: &str) -> String {
    if name.chars().count() > PODIUM_NAME_MAX_CHARS {
        let cut: String = name.chars().take(PODIUM_NAME_MAX_CHARS).collect();
        format!("{}...", cut)
    } else {
        name.to_string()
    }
}

impl Session {
    pub fn podium_of(&self, participant: &ParticipantId) -> Option<usize> {
        self.podiums.iter().position(|p| p.is_occupied_by(participant))
    }

    pub(crate) fn set_button(&mut self, index: usize, color: ColorState) {
        if let Some(podium) = self.podiums.get_mut(index) {
            podium.button = color;
            self.presentation
                .set_highlight(HighlightTarget::BuzzButton(index), color);
        }
    }

    /// Seat a participant. Ignored if the seat is taken or they already hold one.
    pub fn join_podium(&mut self, index: usize, participant: &ParticipantId) {
        let seat_free = self.podiums.get(index).is_some_and(|p| !p.is_occupied());
        if !seat_free || self.podium_of(participant).is_some() {
            tracing::debug!("Podium {} join by {} ignored", index, participant);
            return;
        }

        let name = self
            .registry
            .get(participant)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| participant.clone());
        let display_name = podium_display_name(&name);

        let podium = &mut self.podiums[index];
        podium.occupant = Some(participant.clone());
        podium.display_name = display_name.clone();
        podium.score = 0;
        podium.has_buzzed = false;
        tracing::info!("{} took podium {}", name, index);

        self.presentation
            .set_text(DisplayTarget::PodiumName(index), display_name);
        self.presentation
            .set_text(DisplayTarget::PodiumScore(index), "0");
        self.presentation.play_sound(Sound::Click);
    }

    /// Only the occupant may leave their own podium
    pub fn leave_podium(&mut self, index: usize, participant: &ParticipantId) {
        if self
            .podiums
            .get(index)
            .is_some_and(|p| p.is_occupied_by(participant))
        {
            tracing::info!("{} left podium {}", participant, index);
            self.vacate_podium(index);
        }
    }

    pub fn kick(&mut self, index: usize) {
        if self.podiums.get(index).is_some_and(Podium::is_occupied) {
            tracing::info!("Kicking occupant of podium {}", index);
            self.vacate_podium(index);
        }
    }

    /// Empty a seat, zeroing its score and buzz state
    pub(crate) fn vacate_podium(&mut self, index: usize) {
        let Some(podium) = self.podiums.get_mut(index) else {
            return;
        };
        let was_occupied = podium.is_occupied();
        podium.occupant = None;
        podium.display_name.clear();
        podium.score = 0;
        podium.has_buzzed = false;

        if self.buzz_winner == Some(index) {
            self.clear_buzz_winner();
        }
        if was_occupied {
            self.presentation
                .set_text(DisplayTarget::PodiumName(index), "");
            self.presentation
                .set_text(DisplayTarget::PodiumScore(index), "0");
        }
    }

    pub fn adjust_score(&mut self, index: usize, delta: i64) {
        let Some(podium) = self.podiums.get_mut(index).filter(|p| p.is_occupied()) else {
            return;
        };
        podium.score = podium.score.saturating_add(delta);
        let score = podium.score;
        tracing::info!("Podium {} score adjusted by {:+} to {}", index, delta, score);
        self.presentation
            .set_text(DisplayTarget::PodiumScore(index), score.to_string());
    }

    /// Claim the right to answer. First valid call wins; anything else is a silent no-op.
    pub fn buzz(&mut self, index: usize, participant: &ParticipantId) -> bool {
        if self.game_mode != GameMode::HostModerated
            || self.mode != Mode::Question
            || self.buzz_winner.is_some()
        {
            return false;
        }
        let Some(podium) = self.podiums.get_mut(index) else {
            return false;
        };
        if !podium.is_occupied_by(participant) || podium.has_buzzed {
            return false;
        }

        podium.has_buzzed = true;
        self.buzz_winner = Some(index);
        tracing::info!("Podium {} ({}) buzzed in", index, participant);

        for i in 0..self.podiums.len() {
            let color = if i == index {
                ColorState::Buzzed
            } else {
                ColorState::Locked
            };
            self.set_button(i, color);
        }
        self.presentation
            .set_highlight(HighlightTarget::PodiumPanels(index), ColorState::Buzzed);
        self.presentation
            .set_highlight(HighlightTarget::ScreenBorder, ColorState::Buzzed);
        self.presentation.set_camera_focus(Some(index));
        self.presentation.play_sound(Sound::Buzz);
        true
    }

    /// Reopen buzzing for podiums that have not buzzed this question
    pub fn reset_buzz(&mut self) {
        if self.mode != Mode::Question || self.buzz_winner.is_none() {
            return;
        }
        tracing::info!("Buzz reset (was podium {:?})", self.buzz_winner);
        self.clear_buzz_winner();
    }

    fn clear_buzz_winner(&mut self) {
        if let Some(winner) = self.buzz_winner.take() {
            self.presentation
                .set_highlight(HighlightTarget::PodiumStripes(winner), ColorState::Neutral);
        }
        for i in 0..self.podiums.len() {
            let color = if self.podiums[i].has_buzzed {
                ColorState::Locked
            } else {
                ColorState::Available
            };
            self.set_button(i, color);
            self.presentation
                .set_highlight(HighlightTarget::PodiumPanels(i), ColorState::Neutral);
        }
        self.presentation.set_camera_focus(None);
        self.presentation
            .set_highlight(HighlightTarget::ScreenBorder, ColorState::Neutral);

        if self.answer_lock != AnswerLock::Confirmed {
            self.select_answer(None, true, false);
            self.answer_lock = AnswerLock::Unlocked;
            self.driver_selected = false;
        }
    }

    /// Answer slot pressed during a host-moderated question
    pub(crate) fn podium_select(&mut self, actor: &ParticipantId, index: usize) {
        if self.answer_lock == AnswerLock::Confirmed {
            return;
        }

        if self.can_drive(actor) {
            // Drivers answer on behalf of the podium that buzzed, never ahead of it
            if self.buzz_winner.is_none() {
                return;
            }
            let selected = self.select_answer(Some(index), true, false);
            self.driver_selected = selected.is_some();
            self.answer_lock = if selected.is_some() {
                AnswerLock::Tentative
            } else {
                AnswerLock::Unlocked
            };
            return;
        }

        let holds_buzz = self
            .buzz_winner
            .is_some_and(|w| self.podiums[w].is_occupied_by(actor));
        if holds_buzz && !self.driver_selected {
            let selected = self.select_answer(Some(index), false, false);
            self.answer_lock = if selected.is_some() {
                AnswerLock::Tentative
            } else {
                AnswerLock::Unlocked
            };
        }
    }

    /// The buzzing podium locks in its tentative pick
    pub fn confirm_answer(&mut self, actor: &ParticipantId) {
        if self.game_mode != GameMode::HostModerated
            || self.mode != Mode::Question
            || self.answer_lock != AnswerLock::Tentative
            || self.driver_selected
        {
            return;
        }
        let holds_buzz = self
            .buzz_winner
            .is_some_and(|w| self.podiums[w].is_occupied_by(actor));
        if !holds_buzz {
            return;
        }

        let selected = self.select_answer(self.selected_answer, false, true);
        self.answer_lock = AnswerLock::Confirmed;
        tracing::info!("{} confirmed answer {:?}", actor, selected);
    }

    /// Take the empty host seat, or clear it when held by the presser or a privileged user
    pub fn claim_host(&mut self, actor: &ParticipantId) {
        if self.game_mode != GameMode::HostModerated {
            return;
        }
        match &self.host {
            None => {
                let name = self
                    .registry
                    .get(actor)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| actor.clone());
                tracing::info!("{} is now hosting", name);
                self.host = Some(actor.clone());
                self.presentation
                    .set_text(DisplayTarget::HostSeat, format!("Host: {}", name));
            }
            Some(host) if host == actor || self.registry.is_privileged(actor) => {
                self.clear_host();
            }
            Some(_) => {}
        }
    }

    pub(crate) fn clear_host(&mut self) {
        if self.host.take().is_some() {
            tracing::info!("Host seat cleared");
            self.presentation
                .set_text(DisplayTarget::HostSeat, "Claim host seat");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::presentation::DisplayCommand;
    use crate::protocol::ClientMessage;
    use tokio::time::Instant;

    const NAMES: [&str; 5] = ["p0", "p1", "p2", "p3", "p4"];

    /// Five seated podiums on a displayed question
    fn seated_session() -> (Session, crate::presentation::RecordingBridge) {
        let mut names = vec!["host"];
        names.extend(NAMES);
        let (mut session, bridge) = session_with(GameMode::HostModerated, vec![], &names);
        for (i, n) in NAMES.iter().enumerate() {
            session.join_podium(i, &id(n));
        }
        session.loaded_questions = questions(1, 2);
        session.display_question(0);
        (session, bridge)
    }

    #[test]
    fn test_display_name_truncation() {
        assert_eq!(podium_display_name("Bob"), "Bob");
        assert_eq!(podium_display_name("Abcdefghij"), "Abcdefghij");
        assert_eq!(podium_display_name("Abcdefghijk"), "Abcdefghij...");
    }

    #[test]
    fn test_one_podium_per_participant() {
        let (mut session, _) = session_with(GameMode::HostModerated, vec![], &["a", "b"]);

        session.join_podium(0, &id("a"));
        session.join_podium(1, &id("a"));
        session.join_podium(0, &id("b"));
        session.join_podium(7, &id("b"));

        assert!(session.podiums[0].is_occupied_by(&id("a")));
        assert!(!session.podiums[1].is_occupied());
        assert_eq!(session.podium_of(&id("b")), None);
    }

    #[test]
    fn test_first_buzz_wins() {
        let (mut session, bridge) = seated_session();

        assert!(session.buzz(2, &id("p2")));
        assert!(!session.buzz(4, &id("p4")));

        assert_eq!(session.buzz_winner, Some(2));
        assert!(session.podiums[2].has_buzzed);
        assert!(!session.podiums[4].has_buzzed);
        assert_eq!(session.podiums[4].button, ColorState::Locked);
        assert!(bridge
            .commands()
            .contains(&DisplayCommand::SetCameraFocus { podium: Some(2) }));
    }

    #[test]
    fn test_buzz_requires_own_podium_and_question_mode() {
        let (mut session, _) = seated_session();

        assert!(!session.buzz(1, &id("p3")));
        assert!(!session.buzz(9, &id("p3")));

        session.mode = Mode::Reveal;
        assert!(!session.buzz(3, &id("p3")));
        assert_eq!(session.buzz_winner, None);
    }

    #[test]
    fn test_reset_buzz_keeps_buzzed_podiums_locked() {
        let (mut session, _) = seated_session();
        session.buzz(1, &id("p1"));
        session.podium_select(&id("p1"), 3);
        assert_eq!(session.answer_lock, AnswerLock::Tentative);

        session.reset_buzz();
        assert_eq!(session.buzz_winner, None);
        assert_eq!(session.selected_answer, None);
        assert_eq!(session.answer_lock, AnswerLock::Unlocked);
        assert_eq!(session.podiums[1].button, ColorState::Locked);
        assert_eq!(session.podiums[0].button, ColorState::Available);

        // Podium 1 already had its chance
        assert!(!session.buzz(1, &id("p1")));
        assert!(session.buzz(0, &id("p0")));
    }

    #[test]
    fn test_reset_buzz_keeps_confirmed_answer() {
        let (mut session, _) = seated_session();
        session.buzz(1, &id("p1"));
        session.podium_select(&id("p1"), 3);
        session.confirm_answer(&id("p1"));
        assert_eq!(session.answer_lock, AnswerLock::Confirmed);

        session.reset_buzz();
        assert_eq!(session.selected_answer, Some(3));
        assert_eq!(session.answer_lock, AnswerLock::Confirmed);
    }

    #[test]
    fn test_only_buzz_holder_selects_and_confirms() {
        let (mut session, _) = seated_session();
        session.buzz(1, &id("p1"));

        session.podium_select(&id("p2"), 0);
        assert_eq!(session.selected_answer, None);

        session.podium_select(&id("p1"), 2);
        session.confirm_answer(&id("p2"));
        assert_eq!(session.answer_lock, AnswerLock::Tentative);

        session.confirm_answer(&id("p1"));
        assert_eq!(session.answer_lock, AnswerLock::Confirmed);

        // Locked in
        session.podium_select(&id("p1"), 0);
        assert_eq!(session.selected_answer, Some(2));
    }

    #[test]
    fn test_driver_selection_blocks_podium() {
        let (mut session, _) = seated_session();
        session.buzz(1, &id("p1"));

        session.podium_select(&id("host"), 0);
        assert_eq!(session.selected_answer, Some(0));
        assert!(session.driver_selected);

        session.podium_select(&id("p1"), 2);
        assert_eq!(session.selected_answer, Some(0));
        session.confirm_answer(&id("p1"));
        assert_eq!(session.answer_lock, AnswerLock::Tentative);
    }

    #[test]
    fn test_leave_and_kick_reset_score() {
        let (mut session, _) = seated_session();
        session.adjust_score(0, 3);
        session.adjust_score(1, -2);
        assert_eq!(session.podiums[0].score, 3);

        session.leave_podium(0, &id("p1"));
        assert!(session.podiums[0].is_occupied());

        session.leave_podium(0, &id("p0"));
        assert!(!session.podiums[0].is_occupied());
        assert_eq!(session.podiums[0].score, 0);

        session.buzz(1, &id("p1"));
        session.kick(1);
        assert_eq!(session.podiums[1].score, 0);
        assert!(!session.podiums[1].has_buzzed);
        assert_eq!(session.buzz_winner, None);
    }

    #[test]
    fn test_score_adjustments_saturate() {
        let (mut session, bridge) = seated_session();
        let now = Instant::now();
        for _ in 0..2 {
            session.handle_client_message(
                &id("host"),
                ClientMessage::AdjustScore {
                    podium: 0,
                    delta: i64::MAX,
                },
                now,
            );
        }
        assert_eq!(session.podiums[0].score, i64::MAX);
        assert_eq!(
            bridge.last_text(&DisplayTarget::PodiumScore(0)),
            Some(i64::MAX.to_string())
        );

        // A wrong answer at the floor stays at the floor
        session.podiums[1].score = i64::MIN;
        session.buzz(1, &id("p1"));
        session.tally_and_advance();
        assert_eq!(session.podiums[1].score, i64::MIN);
    }

    #[test]
    fn test_driver_cannot_answer_before_a_buzz() {
        let (mut session, _) = seated_session();
        let wrong = (session.current_question.as_ref().unwrap().correct_index + 1) % ANSWER_COUNT;

        session.podium_select(&id("host"), wrong);
        assert_eq!(session.selected_answer, None);
        assert_eq!(session.answer_lock, AnswerLock::Unlocked);
        assert!(!session.driver_selected);

        // The podium that buzzes later answers for itself
        let correct = session.current_question.as_ref().unwrap().correct_index;
        assert!(session.buzz(0, &id("p0")));
        session.podium_select(&id("p0"), correct);
        session.confirm_answer(&id("p0"));
        assert_eq!(session.selected_answer, Some(correct));
        assert_eq!(session.answer_lock, AnswerLock::Confirmed);

        session.tally_and_advance();
        assert_eq!(session.podiums[0].score, 1);
    }

    #[test]
    fn test_adjust_score_ignores_empty_podium() {
        let (mut session, _) = session_with(GameMode::HostModerated, vec![], &["a"]);
        session.adjust_score(0, 1);
        assert_eq!(session.podiums[0].score, 0);
    }

    #[test]
    fn test_kick_requires_privilege() {
        let (mut session, _) = seated_session();
        session.handle_client_message(&id("p3"), ClientMessage::Kick { podium: 0 }, Instant::now());
        assert!(session.podiums[0].is_occupied());

        session.handle_client_message(
            &id("host"),
            ClientMessage::Kick { podium: 0 },
            Instant::now(),
        );
        assert!(!session.podiums[0].is_occupied());
    }

    #[test]
    fn test_host_seat() {
        let (mut session, bridge) =
            session_with(GameMode::HostModerated, vec![], &["mod", "h", "x"]);

        session.claim_host(&id("h"));
        assert_eq!(session.host, Some(id("h")));
        assert!(session.can_drive(&id("h")));
        assert_eq!(
            bridge.last_text(&DisplayTarget::HostSeat),
            Some("Host: H".to_string())
        );

        session.claim_host(&id("x"));
        assert_eq!(session.host, Some(id("h")));

        session.claim_host(&id("mod"));
        assert_eq!(session.host, None);

        session.claim_host(&id("x"));
        session.leave(&Participant::new("x", "X"));
        assert_eq!(session.host, None);
    }

    #[test]
    fn test_leaving_session_vacates_podium() {
        let (mut session, _) = seated_session();
        session.leave(&Participant::new("p3", "P3"));
        assert!(!session.podiums[3].is_occupied());
    }
}
