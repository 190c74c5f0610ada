use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::config::ParseValueError;
use crate::model::topic::Topic;

/// Every question carries exactly this many options.
pub const OPTION_COUNT: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("explanation cannot be empty")]
    EmptyExplanation,

    #[error("expected 4 options, found {0}")]
    OptionCount(usize),

    #[error("option {0} is empty")]
    EmptyOption(usize),

    #[error("correct option index {0} is outside 0..=3")]
    CorrectIndexOutOfRange(i64),
}

//
// ─── ORIGIN ────────────────────────────────────────────────────────────────────
//

/// Where a question in a session batch was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionOrigin {
    /// Generated for this session by the generation service.
    Ai,
    /// Read from the shared pool.
    Pool,
}

impl QuestionOrigin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionOrigin::Ai => "ai",
            QuestionOrigin::Pool => "pool",
        }
    }
}

impl FromStr for QuestionOrigin {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ai" => Ok(QuestionOrigin::Ai),
            "pool" => Ok(QuestionOrigin::Pool),
            _ => Err(ParseValueError::new("origin", s)),
        }
    }
}

impl fmt::Display for QuestionOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Question shape as emitted by the generation service, before validation.
///
/// Accepts both `correctAnswerIndex` and `correctAnswer` for the answer key,
/// and `text` as an alias of `question`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    #[serde(alias = "text")]
    pub question: String,
    pub options: Vec<String>,
    #[serde(alias = "correctAnswer")]
    pub correct_answer_index: i64,
    pub explanation: String,
}

impl QuestionDraft {
    /// Validate and normalize the draft, tagging it with its topic and origin.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text or explanation is blank, if there
    /// are not exactly four non-blank options, or if the answer index is out
    /// of range.
    pub fn validate(
        self,
        topic: Topic,
        origin: QuestionOrigin,
        generated_at: DateTime<Utc>,
    ) -> Result<Question, QuestionError> {
        let text = self.question.trim().to_string();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        let explanation = self.explanation.trim().to_string();
        if explanation.is_empty() {
            return Err(QuestionError::EmptyExplanation);
        }

        let found = self.options.len();
        let options: Vec<String> = self
            .options
            .into_iter()
            .map(|opt| opt.trim().to_string())
            .collect();
        if let Some(pos) = options.iter().position(String::is_empty) {
            return Err(QuestionError::EmptyOption(pos));
        }
        let options: [String; OPTION_COUNT] = options
            .try_into()
            .map_err(|_| QuestionError::OptionCount(found))?;

        let correct_option = u8::try_from(self.correct_answer_index)
            .ok()
            .filter(|idx| usize::from(*idx) < OPTION_COUNT)
            .ok_or(QuestionError::CorrectIndexOutOfRange(self.correct_answer_index))?;

        Ok(Question {
            text,
            options,
            correct_option,
            explanation,
            topic,
            generated_at,
            origin,
        })
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A validated multiple-choice question. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    text: String,
    options: [String; OPTION_COUNT],
    correct_option: u8,
    explanation: String,
    topic: Topic,
    generated_at: DateTime<Utc>,
    origin: QuestionOrigin,
}

impl Question {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    /// Index of the correct option, always in `0..4`.
    #[must_use]
    pub fn correct_option(&self) -> u8 {
        self.correct_option
    }

    #[must_use]
    pub fn correct_option_text(&self) -> &str {
        &self.options[usize::from(self.correct_option)]
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn topic(&self) -> Topic {
        self.topic
    }

    #[must_use]
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    #[must_use]
    pub fn origin(&self) -> QuestionOrigin {
        self.origin
    }

    #[must_use]
    pub fn is_correct(&self, choice: u8) -> bool {
        choice == self.correct_option
    }

    /// Re-tag the question with a different origin, e.g. when served from the pool.
    #[must_use]
    pub fn with_origin(mut self, origin: QuestionOrigin) -> Self {
        self.origin = origin;
        self
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn draft() -> QuestionDraft {
        QuestionDraft {
            question: "What does a firewall filter?".into(),
            options: vec![
                "Network traffic".into(),
                "Printer jobs".into(),
                "Screen glare".into(),
                "Keyboard input".into(),
            ],
            correct_answer_index: 0,
            explanation: "Firewalls inspect packets.".into(),
        }
    }

    fn topic() -> Topic {
        Topic::parse("Cybersecurity").unwrap()
    }

    #[test]
    fn valid_draft_becomes_question() {
        let q = draft()
            .validate(topic(), QuestionOrigin::Ai, fixed_now())
            .unwrap();
        assert_eq!(q.correct_option(), 0);
        assert_eq!(q.correct_option_text(), "Network traffic");
        assert!(q.is_correct(0));
        assert!(!q.is_correct(3));
        assert_eq!(q.origin(), QuestionOrigin::Ai);
    }

    #[test]
    fn option_count_must_be_four() {
        let mut d = draft();
        d.options.pop();
        let err = d
            .validate(topic(), QuestionOrigin::Ai, fixed_now())
            .unwrap_err();
        assert_eq!(err, QuestionError::OptionCount(3));
    }

    #[test]
    fn answer_index_must_be_in_range() {
        for bad in [-1, 4, 300] {
            let mut d = draft();
            d.correct_answer_index = bad;
            let err = d
                .validate(topic(), QuestionOrigin::Ai, fixed_now())
                .unwrap_err();
            assert_eq!(err, QuestionError::CorrectIndexOutOfRange(bad));
        }
    }

    #[test]
    fn blank_text_and_explanation_are_rejected() {
        let mut d = draft();
        d.question = "  ".into();
        assert_eq!(
            d.validate(topic(), QuestionOrigin::Ai, fixed_now())
                .unwrap_err(),
            QuestionError::EmptyText
        );

        let mut d = draft();
        d.explanation = String::new();
        assert_eq!(
            d.validate(topic(), QuestionOrigin::Ai, fixed_now())
                .unwrap_err(),
            QuestionError::EmptyExplanation
        );
    }

    #[test]
    fn blank_option_is_rejected() {
        let mut d = draft();
        d.options[2] = " ".into();
        assert_eq!(
            d.validate(topic(), QuestionOrigin::Ai, fixed_now())
                .unwrap_err(),
            QuestionError::EmptyOption(2)
        );
    }

    #[test]
    fn origin_can_be_retagged() {
        let q = draft()
            .validate(topic(), QuestionOrigin::Ai, fixed_now())
            .unwrap()
            .with_origin(QuestionOrigin::Pool);
        assert_eq!(q.origin(), QuestionOrigin::Pool);
    }
}
