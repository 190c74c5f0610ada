use quiz_core::model::{Feedback, OwnerId};

use super::SqliteRepository;
use super::mapping::{db_err, map_feedback_row};
use crate::repository::{FeedbackRepository, StorageError};

#[async_trait::async_trait]
impl FeedbackRepository for SqliteRepository {
    async fn append_feedback(&self, feedback: &Feedback) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO feedback (text, author_id, submitted_at)
                VALUES (?1, ?2, ?3)
            ",
        )
        .bind(feedback.text())
        .bind(feedback.author().map(OwnerId::as_str))
        .bind(feedback.submitted_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(res.last_insert_rowid())
    }

    async fn recent_feedback(&self, limit: u32) -> Result<Vec<Feedback>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT text, author_id, submitted_at
                FROM feedback
                ORDER BY submitted_at DESC, id DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_feedback_row).collect()
    }
}
