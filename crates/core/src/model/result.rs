use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::config::{Difficulty, SessionConfig, SessionMode, SourceMode};
use crate::model::ids::{OwnerId, SessionId};
use crate::model::question::Question;
use crate::model::topic::Topic;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("cannot score an empty question set")]
    EmptyQuestionSet,

    #[error("answer recorded for question {index} but only {total} questions exist")]
    AnswerOutOfRange { index: usize, total: usize },

    #[error("correct count {correct} exceeds total {total}")]
    CorrectExceedsTotal { correct: u32, total: u32 },

    #[error("stored score {stored} does not match computed score {expected}")]
    ScoreMismatch { stored: u8, expected: u8 },
}

//
// ─── SCORE ─────────────────────────────────────────────────────────────────────
//

/// Outcome of scoring one finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSummary {
    correct: u32,
    total: u32,
    score: u8,
}

impl ScoreSummary {
    /// Score a session's answers against its questions.
    ///
    /// Unanswered questions count as incorrect.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError::EmptyQuestionSet` when there are no questions and
    /// `ScoreError::AnswerOutOfRange` when an answer key is not a question index.
    pub fn compute(
        questions: &[Question],
        answers: &BTreeMap<usize, u8>,
    ) -> Result<Self, ScoreError> {
        let total = questions.len();
        if total == 0 {
            return Err(ScoreError::EmptyQuestionSet);
        }
        if let Some((&index, _)) = answers.range(total..).next() {
            return Err(ScoreError::AnswerOutOfRange { index, total });
        }

        let correct = answers
            .iter()
            .filter(|(idx, choice)| questions[**idx].is_correct(**choice))
            .count();

        Self::from_counts(
            u32::try_from(correct).unwrap_or(u32::MAX),
            u32::try_from(total).unwrap_or(u32::MAX),
        )
    }

    /// Build a summary from raw counts.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError` if `total` is zero or `correct > total`.
    pub fn from_counts(correct: u32, total: u32) -> Result<Self, ScoreError> {
        if total == 0 {
            return Err(ScoreError::EmptyQuestionSet);
        }
        if correct > total {
            return Err(ScoreError::CorrectExceedsTotal { correct, total });
        }
        Ok(Self {
            correct,
            total,
            score: percentage(correct, total),
        })
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Percentage in `0..=100`, rounded half up.
    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }
}

// round(100 * correct / total) with halves rounded up, in integer arithmetic.
fn percentage(correct: u32, total: u32) -> u8 {
    let correct = u64::from(correct);
    let total = u64::from(total);
    let rounded = (200 * correct + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}

//
// ─── RESULT RECORD ─────────────────────────────────────────────────────────────
//

/// Append-only record of one finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    session_id: SessionId,
    topic: Topic,
    score: u8,
    correct_count: u32,
    total_count: u32,
    mode: SessionMode,
    difficulty: Difficulty,
    source: SourceMode,
    created_at: DateTime<Utc>,
    owner_id: Option<OwnerId>,
}

impl ResultRecord {
    #[must_use]
    pub fn new(
        session_id: SessionId,
        config: &SessionConfig,
        summary: ScoreSummary,
        owner_id: Option<OwnerId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            topic: config.topic(),
            score: summary.score(),
            correct_count: summary.correct(),
            total_count: summary.total(),
            mode: config.mode(),
            difficulty: config.difficulty(),
            source: config.source_mode(),
            created_at,
            owner_id,
        }
    }

    /// Rehydrate a record from storage.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError` if the counts are inconsistent or the stored score
    /// disagrees with them.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        session_id: SessionId,
        topic: Topic,
        score: u8,
        correct_count: u32,
        total_count: u32,
        mode: SessionMode,
        difficulty: Difficulty,
        source: SourceMode,
        created_at: DateTime<Utc>,
        owner_id: Option<OwnerId>,
    ) -> Result<Self, ScoreError> {
        let summary = ScoreSummary::from_counts(correct_count, total_count)?;
        if summary.score() != score {
            return Err(ScoreError::ScoreMismatch {
                stored: score,
                expected: summary.score(),
            });
        }
        Ok(Self {
            session_id,
            topic,
            score,
            correct_count,
            total_count,
            mode,
            difficulty,
            source,
            created_at,
            owner_id,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn topic(&self) -> Topic {
        self.topic
    }

    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn source(&self) -> SourceMode {
        self.source
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// `None` for anonymous sessions.
    #[must_use]
    pub fn owner_id(&self) -> Option<&OwnerId> {
        self.owner_id.as_ref()
    }

    /// Plain-text summary suitable for a downloadable report.
    #[must_use]
    pub fn report(&self) -> String {
        format!(
            "Quiz Report\n\
             ===========\n\
             Topic: {topic}\n\
             Mode: {mode}\n\
             Difficulty: {difficulty}\n\
             Source: {source}\n\
             Score: {score}%\n\
             Correct: {correct}/{total}\n\
             Date: {date}\n",
            topic = self.topic,
            mode = self.mode.label(),
            difficulty = self.difficulty.label(),
            source = self.source,
            score = self.score,
            correct = self.correct_count,
            total = self.total_count,
            date = self.created_at.format("%Y-%m-%d %H:%M UTC"),
        )
    }

    /// File name for the report, e.g. `quiz-report-economics-20231114.txt`.
    #[must_use]
    pub fn report_file_name(&self) -> String {
        let slug: String = self
            .topic
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        let slug = slug
            .split('-')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        format!(
            "quiz-report-{slug}-{}.txt",
            self.created_at.format("%Y%m%d")
        )
    }
}
