use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque ID types for type safety
pub type SessionId = String;
pub type ParticipantId = String;
pub type CategoryId = u32;
pub type QuestionId = String;

/// Number of fixed podium seats in host-moderated mode
pub const PODIUM_COUNT: usize = 5;
/// Every question is presented with four answer slots
pub const ANSWER_COUNT: usize = 4;
/// How many categories are offered at once during category selection
pub const CATEGORY_OPTION_COUNT: usize = 4;
/// Podium name plates show at most this many characters before "..."
pub const PODIUM_NAME_MAX_CHARS: usize = 10;

/// Icon colours handed out to party players in join order
pub const PLAYER_COLORS: &[&str] = &[
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// A host drives every transition, podiums buzz in
    HostModerated,
    /// Countdown driven, every joined player answers
    Timed,
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "host" | "classic" | "host_moderated" => Ok(GameMode::HostModerated),
            "timed" | "party" | "new" => Ok(GameMode::Timed),
            other => Err(format!("Unknown game mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Title,
    CategorySelect,
    Question,
    Reveal,
    Scores,
    GameOver,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Capitalized label for round banners
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("Unknown difficulty: {}", other)),
        }
    }
}

/// Answer selection state of the current question
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnswerLock {
    #[default]
    Unlocked,
    Tentative,
    Confirmed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Per-difficulty question counts the repository reports for one category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: Category,
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl CategoryCount {
    pub fn count_for(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

/// A multiple-choice question as delivered by the question repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: QuestionId,
    pub category_id: CategoryId,
    pub category: String,
    pub difficulty: Difficulty,
    pub question: String,
    pub answer: String,
    pub incorrect: [String; 3],
}

impl Question {
    /// All four answer texts, correct answer first
    pub fn answers(&self) -> [String; ANSWER_COUNT] {
        [
            self.answer.clone(),
            self.incorrect[0].clone(),
            self.incorrect[1].clone(),
            self.incorrect[2].clone(),
        ]
    }
}

/// A connected user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub connected_at: chrono::DateTime<chrono::Utc>,
    /// Granted by the identity provider, never computed by the game
    #[serde(default)]
    pub external_privileged: bool,
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            connected_at: chrono::Utc::now(),
            external_privileged: false,
        }
    }
}

/// Visual state of anything the presentation layer can colour
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColorState {
    Neutral,
    /// Tentative pick by a contestant
    Selected,
    /// Host preview or confirmed pick
    Preview,
    Correct,
    Incorrect,
    /// Buzz button armed
    Available,
    /// Buzz button locked out
    Locked,
    /// Buzz button of the podium holding the buzz
    Buzzed,
    Dimmed,
    Answered,
    Winner,
}

/// A seat in host-moderated mode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Podium {
    pub occupant: Option<ParticipantId>,
    pub display_name: String,
    pub score: i64,
    pub has_buzzed: bool,
    pub button: ColorState,
}

impl Podium {
    pub fn empty() -> Self {
        Self {
            occupant: None,
            display_name: String::new(),
            score: 0,
            has_buzzed: false,
            button: ColorState::Locked,
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    pub fn is_occupied_by(&self, participant: &ParticipantId) -> bool {
        self.occupant.as_ref() == Some(participant)
    }
}

/// A competitor in timed mass-participation mode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: ParticipantId,
    pub name: String,
    pub score: i64,
    pub answered: bool,
    pub answer: Option<usize>,
    /// Seconds left on the answer window when the answer came in
    pub time_to_answer: f64,
    pub color: String,
}

impl Player {
    pub fn new(id: ParticipantId, name: String, color: String) -> Self {
        Self {
            id,
            name,
            score: 0,
            answered: false,
            answer: None,
            time_to_answer: 0.0,
            color,
        }
    }
}

/// One line of the merged leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreEntry {
    pub participant: ParticipantId,
    pub name: String,
    pub score: i64,
}

/// Progress of the outstanding question repository request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Idle,
    Pending {
        ticket: u64,
    },
    Failed {
        message: String,
    },
}
