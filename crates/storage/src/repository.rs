use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    Feedback, OwnerId, Question, QuestionDraft, QuestionError, QuestionOrigin, ResultRecord,
    SessionId, Topic,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── SHARED POOL ───────────────────────────────────────────────────────────────
//

/// Persisted shape of a shared-pool entry.
///
/// The pool has many writers, so rows are kept raw and only validated when
/// read back into a `Question`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolQuestionRecord {
    pub id: Option<i64>,
    pub topic: Topic,
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: i64,
    pub explanation: String,
    pub origin: QuestionOrigin,
    pub created_at: DateTime<Utc>,
}

impl PoolQuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            id: None,
            topic: question.topic(),
            text: question.text().to_owned(),
            options: question.options().to_vec(),
            correct_index: i64::from(question.correct_option()),
            explanation: question.explanation().to_owned(),
            origin: question.origin(),
            created_at: question.generated_at(),
        }
    }

    /// Validate the record into a question served from the pool.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the stored row violates the question shape.
    pub fn into_question(self) -> Result<Question, QuestionError> {
        QuestionDraft {
            question: self.text,
            options: self.options,
            correct_answer_index: self.correct_index,
            explanation: self.explanation,
        }
        .validate(self.topic, QuestionOrigin::Pool, self.created_at)
    }
}

/// Shared, topic-keyed store of previously generated questions.
#[async_trait]
pub trait QuestionPoolRepository: Send + Sync {
    /// Append a batch of questions. No ordering or transactional guarantee.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the batch cannot be written. Some records may
    /// have landed before the failure.
    async fn append_batch(&self, questions: &[Question]) -> Result<usize, StorageError>;

    /// Read every entry for a topic.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the read fails.
    async fn list_for_topic(&self, topic: Topic) -> Result<Vec<PoolQuestionRecord>, StorageError>;

    /// Count entries for a topic.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the count fails.
    async fn count_for_topic(&self, topic: Topic) -> Result<u32, StorageError>;
}

//
// ─── HISTORY ───────────────────────────────────────────────────────────────────
//

/// Result record paired with its storage row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub id: i64,
    pub record: ResultRecord,
}

impl ResultRow {
    #[must_use]
    pub fn new(id: i64, record: ResultRecord) -> Self {
        Self { id, record }
    }
}

/// Append-only result history, keyed by owner.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Append a finished session's result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a result for the same session was
    /// already stored, or other storage errors.
    async fn append_result(&self, record: &ResultRecord) -> Result<i64, StorageError>;

    /// Most recent results for one owner, newest first.
    ///
    /// `None` reads the anonymous rows only; owners never see each other's
    /// history.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the read fails.
    async fn recent_results(
        &self,
        owner: Option<&OwnerId>,
        limit: u32,
    ) -> Result<Vec<ResultRow>, StorageError>;
}

//
// ─── FEEDBACK ──────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn append_feedback(&self, feedback: &Feedback) -> Result<i64, StorageError>;

    /// Most recent feedback entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the read fails.
    async fn recent_feedback(&self, limit: u32) -> Result<Vec<Feedback>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for tests and the
/// anonymous local-only history.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    pool: Arc<Mutex<Vec<PoolQuestionRecord>>>,
    results: Arc<Mutex<Vec<ResultRow>>>,
    sessions: Arc<Mutex<HashMap<SessionId, i64>>>,
    feedback: Arc<Mutex<Vec<Feedback>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn row_id(len: usize) -> Result<i64, StorageError> {
    i64::try_from(len + 1).map_err(|_| StorageError::Serialization("row id overflow".into()))
}

#[async_trait]
impl QuestionPoolRepository for InMemoryRepository {
    async fn append_batch(&self, questions: &[Question]) -> Result<usize, StorageError> {
        let mut guard = self.pool.lock().map_err(lock_err)?;
        for question in questions {
            let mut record = PoolQuestionRecord::from_question(question);
            record.id = Some(row_id(guard.len())?);
            guard.push(record);
        }
        Ok(questions.len())
    }

    async fn list_for_topic(&self, topic: Topic) -> Result<Vec<PoolQuestionRecord>, StorageError> {
        let guard = self.pool.lock().map_err(lock_err)?;
        Ok(guard.iter().filter(|r| r.topic == topic).cloned().collect())
    }

    async fn count_for_topic(&self, topic: Topic) -> Result<u32, StorageError> {
        let guard = self.pool.lock().map_err(lock_err)?;
        let count = guard.iter().filter(|r| r.topic == topic).count();
        u32::try_from(count).map_err(|_| StorageError::Serialization("count overflow".into()))
    }
}

#[async_trait]
impl HistoryRepository for InMemoryRepository {
    async fn append_result(&self, record: &ResultRecord) -> Result<i64, StorageError> {
        let mut sessions = self.sessions.lock().map_err(lock_err)?;
        if sessions.contains_key(&record.session_id()) {
            return Err(StorageError::Conflict);
        }
        let mut results = self.results.lock().map_err(lock_err)?;
        let id = row_id(results.len())?;
        results.push(ResultRow::new(id, record.clone()));
        sessions.insert(record.session_id(), id);
        Ok(id)
    }

    async fn recent_results(
        &self,
        owner: Option<&OwnerId>,
        limit: u32,
    ) -> Result<Vec<ResultRow>, StorageError> {
        let guard = self.results.lock().map_err(lock_err)?;
        let mut rows: Vec<ResultRow> = guard
            .iter()
            .filter(|row| row.record.owner_id() == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.record
                .created_at()
                .cmp(&a.record.created_at())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryRepository {
    async fn append_feedback(&self, feedback: &Feedback) -> Result<i64, StorageError> {
        let mut guard = self.feedback.lock().map_err(lock_err)?;
        let id = row_id(guard.len())?;
        guard.push(feedback.clone());
        Ok(id)
    }

    async fn recent_feedback(&self, limit: u32) -> Result<Vec<Feedback>, StorageError> {
        let guard = self.feedback.lock().map_err(lock_err)?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub pool: Arc<dyn QuestionPoolRepository>,
    pub history: Arc<dyn HistoryRepository>,
    pub feedback: Arc<dyn FeedbackRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let pool: Arc<dyn QuestionPoolRepository> = Arc::new(repo.clone());
        let history: Arc<dyn HistoryRepository> = Arc::new(repo.clone());
        let feedback: Arc<dyn FeedbackRepository> = Arc::new(repo);
        Self {
            pool,
            history,
            feedback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{ScoreSummary, SessionConfigDraft};
    use quiz_core::time::fixed_now;

    fn question(topic: &str, text: &str) -> Question {
        QuestionDraft {
            question: text.into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer_index: 2,
            explanation: "c is right".into(),
        }
        .validate(Topic::parse(topic).unwrap(), QuestionOrigin::Ai, fixed_now())
        .unwrap()
    }

    fn record(owner: Option<&str>, minutes: i64) -> ResultRecord {
        let config = SessionConfigDraft::for_topic("Marketing").validate().unwrap();
        ResultRecord::new(
            SessionId::new(),
            &config,
            ScoreSummary::from_counts(4, 5).unwrap(),
            owner.map(|o| OwnerId::new(o).unwrap()),
            fixed_now() + chrono::Duration::minutes(minutes),
        )
    }

    #[tokio::test]
    async fn pool_is_keyed_by_topic() {
        let repo = InMemoryRepository::new();
        repo.append_batch(&[question("Marketing", "m1"), question("Economics", "e1")])
            .await
            .unwrap();
        repo.append_batch(&[question("Marketing", "m2")]).await.unwrap();

        let marketing = Topic::parse("Marketing").unwrap();
        assert_eq!(repo.count_for_topic(marketing).await.unwrap(), 2);
        let rows = repo.list_for_topic(marketing).await.unwrap();
        let q = rows[0].clone().into_question().unwrap();
        assert_eq!(q.origin(), QuestionOrigin::Pool);
        assert_eq!(q.correct_option(), 2);
    }

    #[tokio::test]
    async fn duplicate_session_result_conflicts() {
        let repo = InMemoryRepository::new();
        let rec = record(Some("u1"), 0);
        repo.append_result(&rec).await.unwrap();
        let err = repo.append_result(&rec).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn history_is_per_owner_and_newest_first() {
        let repo = InMemoryRepository::new();
        repo.append_result(&record(Some("u1"), 0)).await.unwrap();
        repo.append_result(&record(Some("u1"), 10)).await.unwrap();
        repo.append_result(&record(Some("u2"), 5)).await.unwrap();
        repo.append_result(&record(None, 7)).await.unwrap();

        let u1 = OwnerId::new("u1").unwrap();
        let rows = repo.recent_results(Some(&u1), 20).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].record.created_at() > rows[1].record.created_at());

        let anon = repo.recent_results(None, 20).await.unwrap();
        assert_eq!(anon.len(), 1);
        assert!(anon[0].record.owner_id().is_none());

        assert_eq!(repo.recent_results(Some(&u1), 1).await.unwrap().len(), 1);
    }
}
