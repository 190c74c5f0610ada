use thiserror::Error;

use crate::model::{
    ConfigError, FeedbackError, ParseIdError, ParseValueError, QuestionError, ScoreError,
    SettingsError, TopicError,
};

/// Umbrella error for callers that only need to report a domain failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Feedback(#[from] FeedbackError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
    #[error(transparent)]
    ParseValue(#[from] ParseValueError),
}
