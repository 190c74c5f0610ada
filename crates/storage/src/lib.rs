#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    FeedbackRepository, HistoryRepository, InMemoryRepository, PoolQuestionRecord,
    QuestionPoolRepository, ResultRow, Storage, StorageError,
};
