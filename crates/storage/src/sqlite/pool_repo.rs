use quiz_core::model::{Question, Topic};
use tracing::warn;

use super::SqliteRepository;
use super::mapping::{db_err, map_pool_row, u32_from_i64};
use crate::repository::{PoolQuestionRecord, QuestionPoolRepository, StorageError};

#[async_trait::async_trait]
impl QuestionPoolRepository for SqliteRepository {
    async fn append_batch(&self, questions: &[Question]) -> Result<usize, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        for question in questions {
            let [o0, o1, o2, o3] = question.options();
            sqlx::query(
                r"
                    INSERT INTO pool_questions (
                        topic, question, option_0, option_1, option_2, option_3,
                        correct_index, explanation, origin, created_at
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ",
            )
            .bind(question.topic().as_str())
            .bind(question.text())
            .bind(o0.as_str())
            .bind(o1.as_str())
            .bind(o2.as_str())
            .bind(o3.as_str())
            .bind(i64::from(question.correct_option()))
            .bind(question.explanation())
            .bind(question.origin().as_str())
            .bind(question.generated_at())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(questions.len())
    }

    async fn list_for_topic(&self, topic: Topic) -> Result<Vec<PoolQuestionRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, topic, question, option_0, option_1, option_2, option_3,
                    correct_index, explanation, origin, created_at
                FROM pool_questions
                WHERE topic = ?1
            ",
        )
        .bind(topic.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .iter()
            .filter_map(|row| match map_pool_row(row) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(topic = %topic, error = %err, "skipping unreadable pool row");
                    None
                }
            })
            .collect())
    }

    async fn count_for_topic(&self, topic: Topic) -> Result<u32, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pool_questions WHERE topic = ?1")
            .bind(topic.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        u32_from_i64("count", count)
    }
}
