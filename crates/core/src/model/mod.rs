mod config;
mod feedback;
mod identity;
mod ids;
mod question;
mod result;
mod settings;
pub mod topic;

pub use config::{
    ConfigError, DEFAULT_DURATION_MINUTES, DEFAULT_QUESTION_COUNT, Difficulty,
    MAX_DURATION_MINUTES, MAX_QUESTION_COUNT, MIN_DURATION_MINUTES, MIN_QUESTION_COUNT,
    ParseValueError, SessionConfig, SessionConfigDraft, SessionMode, SourceMode,
};
pub use feedback::{Feedback, FeedbackError, MAX_FEEDBACK_LEN};
pub use identity::Identity;
pub use ids::{OwnerId, ParseIdError, SessionId};
pub use question::{OPTION_COUNT, Question, QuestionDraft, QuestionError, QuestionOrigin};
pub use result::{ResultRecord, ScoreError, ScoreSummary};
pub use settings::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, GenerationSettings,
    GenerationSettingsDraft, SettingsError,
};
pub use topic::{TOPICS, Topic, TopicError};
