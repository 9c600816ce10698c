//! Presentation bridge
//!
//! The game core never renders anything itself. It describes what the audience should see
//! through a narrow set of fire-and-forget display commands addressed at typed targets.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::protocol::{Outbound, ServerMessage};
use crate::types::{ColorState, ParticipantId};

/// Text surfaces known to the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DisplayTarget {
    Question,
    Answer(usize),
    RoundTitle,
    RoundCategory,
    RoundQuestionCount,
    Countdown,
    PodiumName(usize),
    PodiumScore(usize),
    HostSeat,
    Scoreboard,
    Winner,
    /// Free-form prompt line ("Select a category", "Join Game", ...)
    Prompt,
    PlayerDelta(ParticipantId),
    PlayerCount,
}

/// Surfaces that only change colour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum HighlightTarget {
    Answer(usize),
    BuzzButton(usize),
    PodiumStripes(usize),
    PodiumPanels(usize),
    PlayerIcon(ParticipantId),
    ScreenBorder,
    Crown(ParticipantId),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sound {
    Buzz,
    Correct,
    Wrong,
    Click,
    TickTock,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum DisplayCommand {
    SetText {
        target: DisplayTarget,
        content: String,
    },
    SetHighlight {
        target: HighlightTarget,
        color: ColorState,
    },
    SetCameraFocus {
        podium: Option<usize>,
    },
    PlaySound {
        sound: Sound,
    },
}

/// Sink for display commands and targeted notices
pub trait PresentationBridge: Send + Sync {
    fn dispatch(&self, command: DisplayCommand);

    /// Show a message to a single participant only
    fn notify(&self, participant: &ParticipantId, message: &str);
}

/// Typed helpers over `dispatch`
pub trait PresentationExt {
    fn set_text(&self, target: DisplayTarget, content: impl Into<String>);
    fn set_highlight(&self, target: HighlightTarget, color: ColorState);
    fn set_camera_focus(&self, podium: Option<usize>);
    fn play_sound(&self, sound: Sound);
}

impl<T: PresentationBridge + ?Sized> PresentationExt for T {
    fn set_text(&self, target: DisplayTarget, content: impl Into<String>) {
        self.dispatch(DisplayCommand::SetText {
            target,
            content: content.into(),
        });
    }

    fn set_highlight(&self, target: HighlightTarget, color: ColorState) {
        self.dispatch(DisplayCommand::SetHighlight { target, color });
    }

    fn set_camera_focus(&self, podium: Option<usize>) {
        self.dispatch(DisplayCommand::SetCameraFocus { podium });
    }

    fn play_sound(&self, sound: Sound) {
        self.dispatch(DisplayCommand::PlaySound { sound });
    }
}

/// Bridge that fans commands out to every websocket client
pub struct BroadcastBridge {
    tx: broadcast::Sender<Outbound>,
}

impl BroadcastBridge {
    pub fn new(tx: broadcast::Sender<Outbound>) -> Self {
        Self { tx }
    }
}

impl PresentationBridge for BroadcastBridge {
    fn dispatch(&self, command: DisplayCommand) {
        // No receivers just means nobody is watching right now
        let _ = self.tx.send(Outbound::all(ServerMessage::Display { command }));
    }

    fn notify(&self, participant: &ParticipantId, message: &str) {
        let _ = self.tx.send(Outbound::to(
            participant.clone(),
            ServerMessage::Notice {
                message: message.to_string(),
            },
        ));
    }
}

/// Bridge that keeps everything it receives, for tests and headless runs
#[derive(Clone, Default)]
pub struct RecordingBridge {
    commands: Arc<Mutex<Vec<DisplayCommand>>>,
    notices: Arc<Mutex<Vec<(ParticipantId, String)>>>,
}

impl RecordingBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<DisplayCommand> {
        self.commands
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn notices(&self) -> Vec<(ParticipantId, String)> {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Most recent text pushed to a target
    pub fn last_text(&self, target: &DisplayTarget) -> Option<String> {
        self.commands().into_iter().rev().find_map(|c| match c {
            DisplayCommand::SetText { target: t, content } if &t == target => Some(content),
            _ => None,
        })
    }

    /// Most recent colour pushed to a target
    pub fn last_highlight(&self, target: &HighlightTarget) -> Option<ColorState> {
        self.commands().into_iter().rev().find_map(|c| match c {
            DisplayCommand::SetHighlight { target: t, color } if &t == target => Some(color),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.commands
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl PresentationBridge for RecordingBridge {
    fn dispatch(&self, command: DisplayCommand) {
        self.commands
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(command);
    }

    fn notify(&self, participant: &ParticipantId, message: &str) {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((participant.clone(), message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_bridge_tracks_latest_text() {
        let bridge = RecordingBridge::new();
        let dyn_bridge: Arc<dyn PresentationBridge> = Arc::new(bridge.clone());

        dyn_bridge.set_text(DisplayTarget::Question, "first");
        dyn_bridge.set_text(DisplayTarget::Question, "second");
        dyn_bridge.set_highlight(HighlightTarget::Answer(2), ColorState::Correct);

        assert_eq!(
            bridge.last_text(&DisplayTarget::Question),
            Some("second".to_string())
        );
        assert_eq!(
            bridge.last_highlight(&HighlightTarget::Answer(2)),
            Some(ColorState::Correct)
        );
        assert_eq!(bridge.last_text(&DisplayTarget::Scoreboard), None);
    }

    #[test]
    fn test_display_command_wire_shape() {
        let cmd = DisplayCommand::SetHighlight {
            target: HighlightTarget::BuzzButton(3),
            color: ColorState::Buzzed,
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["cmd"], "set_highlight");
        assert_eq!(json["target"]["kind"], "buzz_button");
        assert_eq!(json["target"]["id"], 3);
        assert_eq!(json["color"], "buzzed");
    }

    #[tokio::test]
    async fn test_broadcast_bridge_targets_notices() {
        let (tx, mut rx) = broadcast::channel(8);
        let bridge = BroadcastBridge::new(tx);

        bridge.notify(&"alice".to_string(), "hello");
        let out = rx.recv().await.unwrap();
        assert_eq!(out.target, Some("alice".to_string()));
        assert!(matches!(out.message, ServerMessage::Notice { .. }));
    }
}
