use crate::presentation::DisplayCommand;
use crate::state::SessionSnapshot;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    // Title menu
    ChooseMode {
        mode: GameMode,
    },
    ClaimHost,
    JoinGame,
    StartGame,
    // Podium controls
    JoinPodium {
        podium: usize,
    },
    LeavePodium {
        podium: usize,
    },
    Buzz {
        podium: usize,
    },
    SelectAnswer {
        index: usize,
    },
    ConfirmAnswer,
    // Driving controls (privileged or host)
    Advance,
    ResetBuzz,
    AdjustScore {
        podium: usize,
        delta: i64,
    },
    Kick {
        podium: usize,
    },
    ToggleScores,
    NextRound,
    EndGame,
    ResetGame,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        participant_id: ParticipantId,
        display_name: String,
        snapshot: SessionSnapshot,
        server_now: String,
    },
    Display {
        command: DisplayCommand,
    },
    /// Message meant for a single participant
    Notice {
        message: String,
    },
    Error {
        code: String,
        msg: String,
    },
}

/// A server message plus its audience (`None` = everybody)
#[derive(Debug, Clone)]
pub struct Outbound {
    pub target: Option<ParticipantId>,
    pub message: ServerMessage,
}

impl Outbound {
    pub fn all(message: ServerMessage) -> Self {
        Self {
            target: None,
            message,
        }
    }

    pub fn to(participant: ParticipantId, message: ServerMessage) -> Self {
        Self {
            target: Some(participant),
            message,
        }
    }

    pub fn is_for(&self, participant: &ParticipantId) -> bool {
        match &self.target {
            Some(t) => t == participant,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_tags() {
        let msg: ClientMessage = serde_json::from_str(r#"{"t":"buzz","podium":2}"#).unwrap();
        assert_eq!(msg, ClientMessage::Buzz { podium: 2 });

        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"choose_mode","mode":"timed"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::ChooseMode {
                mode: GameMode::Timed
            }
        );

        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"adjust_score","podium":0,"delta":-1}"#).unwrap();
        assert_eq!(msg, ClientMessage::AdjustScore { podium: 0, delta: -1 });
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"t":"host_start_round"}"#).is_err());
    }

    #[test]
    fn test_outbound_targeting() {
        let notice = ServerMessage::Notice {
            message: "hi".to_string(),
        };
        let everyone = Outbound::all(notice.clone());
        let only_bob = Outbound::to("bob".to_string(), notice);

        assert!(everyone.is_for(&"alice".to_string()));
        assert!(only_bob.is_for(&"bob".to_string()));
        assert!(!only_bob.is_for(&"alice".to_string()));
    }
}
