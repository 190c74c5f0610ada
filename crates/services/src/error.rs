//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{ConfigError, FeedbackError, ScoreError, SettingsError, Topic};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::sessions::Phase;

/// Errors emitted by question generators and the retrying client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Transport(String),
    #[error("generation service returned status {status}: {message}")]
    Service { status: u16, message: String },
    #[error("could not read generation response: {0}")]
    Parse(String),
    #[error("generated questions do not match the expected shape: {0}")]
    Schema(String),
    #[error("invalid generation request: {0}")]
    InvalidRequest(String),
    #[error("question generation is not configured")]
    Disabled,
}

impl GenerationError {
    /// Schema violations and configuration problems are fatal; everything
    /// else may succeed on another attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::Transport(_)
                | GenerationError::Service { .. }
                | GenerationError::Parse(_)
        )
    }
}

/// Errors emitted while sourcing a session's question batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SourcingError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("the shared pool has {available} questions for {topic}, {requested} were requested")]
    EmptyPool {
        topic: Topic,
        available: usize,
        requested: usize,
    },
    #[error("question batch is unusable: {0}")]
    Schema(String),
    #[error("question pool unavailable: {0}")]
    Storage(String),
}

impl From<StorageError> for SourcingError {
    fn from(value: StorageError) -> Self {
        SourcingError::Storage(value.to_string())
    }
}

/// Errors emitted by the session state machine and its driver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("operation requires the {expected} phase, session is {actual}")]
    WrongPhase { expected: Phase, actual: Phase },
    #[error("event belongs to a session that is no longer current")]
    StaleSession,
    #[error("precondition violated: {0}")]
    Precondition(String),
    #[error("option {0} does not exist")]
    OptionOutOfRange(u8),
    #[error("this question has already been revealed")]
    AnswerLocked,
    #[error("cannot go back from a revealed question")]
    RetreatLocked,
    #[error("already at the first question")]
    AtFirstQuestion,
    #[error(transparent)]
    Score(#[from] ScoreError),
}

/// Errors emitted while persisting or reading result history.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `FeedbackService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FeedbackServiceError {
    #[error(transparent)]
    Feedback(#[from] FeedbackError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `PoolSeedingService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeedingError {
    #[error("seed count must be between 1 and 200, got {0}")]
    InvalidCount(u32),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
