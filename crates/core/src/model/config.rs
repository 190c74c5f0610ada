use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::topic::{Topic, TopicError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("choose a topic before starting")]
    EmptyTopic,

    #[error(transparent)]
    Topic(#[from] TopicError),

    #[error("question count must be between 5 and 200, got {0}")]
    QuestionCount(u32),

    #[error("duration must be between 1 and 120 minutes, got {0}")]
    Duration(u32),
}

/// Error for parsing one of the session enums from its storage or CLI form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {kind} value: {raw}")]
pub struct ParseValueError {
    kind: &'static str,
    raw: String,
}

impl ParseValueError {
    #[must_use]
    pub fn new(kind: &'static str, raw: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
        }
    }
}

//
// ─── LIMITS ────────────────────────────────────────────────────────────────────
//

pub const MIN_QUESTION_COUNT: u32 = 5;
pub const MAX_QUESTION_COUNT: u32 = 200;
pub const DEFAULT_QUESTION_COUNT: u32 = 20;

pub const MIN_DURATION_MINUTES: u32 = 1;
pub const MAX_DURATION_MINUTES: u32 = 120;
pub const DEFAULT_DURATION_MINUTES: u32 = 25;

//
// ─── ENUMS ─────────────────────────────────────────────────────────────────────
//

/// How a session is administered.
///
/// - `Practice`: each answer is revealed immediately with its explanation.
/// - `Timed`: a countdown runs and answers are only scored at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    #[default]
    Practice,
    Timed,
}

impl SessionMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Practice => "practice",
            SessionMode::Timed => "timed",
        }
    }

    /// Label shown to players; timed sessions are presented as ranked.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            SessionMode::Practice => "Practice",
            SessionMode::Timed => "Ranked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    #[default]
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

/// Where a session's questions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    #[default]
    Ai,
    Pool,
}

impl SourceMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceMode::Ai => "ai",
            SourceMode::Pool => "pool",
        }
    }
}

impl FromStr for SessionMode {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "practice" => Ok(SessionMode::Practice),
            "timed" | "ranked" => Ok(SessionMode::Timed),
            _ => Err(ParseValueError::new("mode", s)),
        }
    }
}

impl FromStr for Difficulty {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(ParseValueError::new("difficulty", s)),
        }
    }
}

impl FromStr for SourceMode {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ai" => Ok(SourceMode::Ai),
            "pool" => Ok(SourceMode::Pool),
            _ => Err(ParseValueError::new("source", s)),
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Editable session configuration as collected on the landing screen.
///
/// The draft is kept while sourcing runs and after a sourcing failure, so a
/// retry does not require re-entering anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfigDraft {
    pub topic: String,
    pub mode: SessionMode,
    pub question_count: u32,
    pub duration_minutes: u32,
    pub difficulty: Difficulty,
    pub source_mode: SourceMode,
}

impl Default for SessionConfigDraft {
    fn default() -> Self {
        Self {
            topic: String::new(),
            mode: SessionMode::default(),
            question_count: DEFAULT_QUESTION_COUNT,
            duration_minutes: DEFAULT_DURATION_MINUTES,
            difficulty: Difficulty::default(),
            source_mode: SourceMode::default(),
        }
    }
}

impl SessionConfigDraft {
    #[must_use]
    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    /// Validate the draft into a session configuration.
    ///
    /// The duration is only checked for timed sessions.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the topic is blank or unknown, or if a bound
    /// is violated.
    pub fn validate(&self) -> Result<SessionConfig, ConfigError> {
        if self.topic.trim().is_empty() {
            return Err(ConfigError::EmptyTopic);
        }
        let topic = Topic::parse(&self.topic)?;

        if !(MIN_QUESTION_COUNT..=MAX_QUESTION_COUNT).contains(&self.question_count) {
            return Err(ConfigError::QuestionCount(self.question_count));
        }
        if self.mode == SessionMode::Timed
            && !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&self.duration_minutes)
        {
            return Err(ConfigError::Duration(self.duration_minutes));
        }

        Ok(SessionConfig {
            topic,
            mode: self.mode,
            question_count: self.question_count,
            duration_minutes: self.duration_minutes,
            difficulty: self.difficulty,
            source_mode: self.source_mode,
        })
    }
}

/// Validated configuration for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    topic: Topic,
    mode: SessionMode,
    question_count: u32,
    duration_minutes: u32,
    difficulty: Difficulty,
    source_mode: SourceMode,
}

impl SessionConfig {
    #[must_use]
    pub fn topic(&self) -> Topic {
        self.topic
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn source_mode(&self) -> SourceMode {
        self.source_mode
    }

    /// Countdown length in seconds; `None` for practice sessions.
    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        match self.mode {
            SessionMode::Timed => Some(self.duration_minutes.saturating_mul(60)),
            SessionMode::Practice => None,
        }
    }

    /// Expected batch size as a `usize`.
    #[must_use]
    pub fn expected_len(&self) -> usize {
        usize::try_from(self.question_count).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn to_draft(&self) -> SessionConfigDraft {
        SessionConfigDraft {
            topic: self.topic.as_str().to_string(),
            mode: self.mode,
            question_count: self.question_count,
            duration_minutes: self.duration_minutes,
            difficulty: self.difficulty,
            source_mode: self.source_mode,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
