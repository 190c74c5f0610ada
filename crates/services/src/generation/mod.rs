//! Question generation: the generator seam, a Gemini-compatible client and
//! the retrying wrapper used by everything that needs fresh questions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    Difficulty, Question, QuestionDraft, QuestionOrigin, SessionConfig, Topic,
};

use crate::error::GenerationError;

mod gemini;
mod retry;

pub use gemini::{GeminiClient, GeminiConfig};
pub use retry::{RetryPolicy, RetryingGenerator};

/// One logical request for a batch of questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationRequest {
    topic: Topic,
    count: u32,
    difficulty: Difficulty,
}

impl GenerationRequest {
    /// # Errors
    ///
    /// Returns `GenerationError::InvalidRequest` when `count` is zero.
    pub fn new(topic: Topic, count: u32, difficulty: Difficulty) -> Result<Self, GenerationError> {
        if count == 0 {
            return Err(GenerationError::InvalidRequest(
                "question count must be greater than zero".into(),
            ));
        }
        Ok(Self {
            topic,
            count,
            difficulty,
        })
    }

    /// Request matching a validated session configuration.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::InvalidRequest` when the configured count is zero.
    pub fn for_session(config: &SessionConfig) -> Result<Self, GenerationError> {
        Self::new(config.topic(), config.question_count(), config.difficulty())
    }

    #[must_use]
    pub fn topic(&self) -> Topic {
        self.topic
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
}

/// A single attempt against an external question-generation service.
///
/// Implementations perform exactly one call; retrying is the caller's job.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// # Errors
    ///
    /// Returns `GenerationError` describing why the attempt failed.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<QuestionDraft>, GenerationError>;
}

/// Validate a generated batch against the question shape and the requested size.
///
/// Any violation is a `Schema` error; the batch is never truncated or padded.
///
/// # Errors
///
/// Returns `GenerationError::Schema` for a malformed question or a batch of
/// unexpected length.
pub fn validate_batch(
    drafts: Vec<QuestionDraft>,
    request: &GenerationRequest,
    generated_at: DateTime<Utc>,
) -> Result<Vec<Question>, GenerationError> {
    let expected = usize::try_from(request.count()).unwrap_or(usize::MAX);
    if drafts.len() != expected {
        return Err(GenerationError::Schema(format!(
            "expected {expected} questions, received {}",
            drafts.len()
        )));
    }

    drafts
        .into_iter()
        .enumerate()
        .map(|(idx, draft)| {
            draft
                .validate(request.topic(), QuestionOrigin::Ai, generated_at)
                .map_err(|err| GenerationError::Schema(format!("question {idx}: {err}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;

    fn draft(text: &str, correct: i64) -> QuestionDraft {
        QuestionDraft {
            question: text.into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer_index: correct,
            explanation: "why".into(),
        }
    }

    fn request(count: u32) -> GenerationRequest {
        GenerationRequest::new(Topic::parse("Marketing").unwrap(), count, Difficulty::Hard)
            .unwrap()
    }

    #[test]
    fn zero_count_is_invalid() {
        let err = GenerationRequest::new(Topic::parse("Marketing").unwrap(), 0, Difficulty::Easy)
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidRequest(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn batch_is_tagged_with_topic_and_origin() {
        let questions =
            validate_batch(vec![draft("q1", 0), draft("q2", 3)], &request(2), fixed_now())
                .unwrap();
        assert_eq!(questions.len(), 2);
        assert!(questions.iter().all(|q| q.origin() == QuestionOrigin::Ai));
        assert!(questions.iter().all(|q| q.topic().as_str() == "Marketing"));
        assert_eq!(questions[1].generated_at(), fixed_now());
    }

    #[test]
    fn wrong_length_is_a_schema_error() {
        let err = validate_batch(vec![draft("q1", 0)], &request(2), fixed_now()).unwrap_err();
        assert!(matches!(err, GenerationError::Schema(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn malformed_question_is_a_schema_error() {
        let err = validate_batch(vec![draft("q1", 0), draft("q2", 9)], &request(2), fixed_now())
            .unwrap_err();
        match err {
            GenerationError::Schema(msg) => assert!(msg.starts_with("question 1")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
