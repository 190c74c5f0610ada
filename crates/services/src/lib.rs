#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod feedback;
pub mod generation;
pub mod history;
pub mod notice;
pub mod pool_writer;
pub mod resolver;
pub mod scoring;
pub mod seeding;
pub mod sessions;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use error::{
    AppServicesError, FeedbackServiceError, GenerationError, PersistenceError, SeedingError,
    SessionError, SourcingError,
};
pub use feedback::FeedbackService;
pub use generation::{
    GeminiClient, GeminiConfig, GenerationRequest, QuestionGenerator, RetryPolicy,
    RetryingGenerator,
};
pub use history::{DEFAULT_HISTORY_LIMIT, HistoryService};
pub use notice::{Notice, NoticeLevel, NoticeReceiver, NoticeSender, notice_channel};
pub use pool_writer::SharedPoolWriter;
pub use resolver::{QuestionSourceResolver, SourcedBatch};
pub use scoring::{AnonymousPolicy, Destination, RecordOutcome, ResultService};
pub use seeding::{DEFAULT_SEED_COUNT, PoolSeedingService, SeedReport};
pub use sessions::{
    Advance, AnswerOutcome, Phase, QuestionView, QuizSession, ReviewItem, SessionDriver,
    SessionProgress, SessionView, TickOutcome, format_clock,
};
