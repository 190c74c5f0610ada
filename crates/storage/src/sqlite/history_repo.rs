use quiz_core::model::{OwnerId, ResultRecord};

use super::SqliteRepository;
use super::mapping::{db_err, map_result_row};
use crate::repository::{HistoryRepository, ResultRow, StorageError};

#[async_trait::async_trait]
impl HistoryRepository for SqliteRepository {
    async fn append_result(&self, record: &ResultRecord) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO results (
                    session_id, owner_id, topic, score, correct_count, total_count,
                    mode, difficulty, source, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(record.session_id().to_string())
        .bind(record.owner_id().map(OwnerId::as_str))
        .bind(record.topic().as_str())
        .bind(i64::from(record.score()))
        .bind(i64::from(record.correct_count()))
        .bind(i64::from(record.total_count()))
        .bind(record.mode().as_str())
        .bind(record.difficulty().as_str())
        .bind(record.source().as_str())
        .bind(record.created_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(res.last_insert_rowid())
    }

    async fn recent_results(
        &self,
        owner: Option<&OwnerId>,
        limit: u32,
    ) -> Result<Vec<ResultRow>, StorageError> {
        // `IS` matches NULL owners as well, so anonymous rows stay separate.
        let rows = sqlx::query(
            r"
                SELECT
                    id, session_id, owner_id, topic, score, correct_count, total_count,
                    mode, difficulty, source, created_at
                FROM results
                WHERE owner_id IS ?1
                ORDER BY created_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(owner.map(OwnerId::as_str))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_result_row).collect()
    }
}
