use std::str::FromStr;

use quiz_core::model::{
    Difficulty, Feedback, OwnerId, QuestionOrigin, ResultRecord, SessionId, SessionMode,
    SourceMode, Topic,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{PoolQuestionRecord, ResultRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps a sqlx failure, turning unique-constraint violations into `Conflict`.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn u8_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn parse_column<T>(row: &SqliteRow, column: &'static str) -> Result<T, StorageError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    let raw: String = row.try_get(column).map_err(ser)?;
    raw.parse::<T>().map_err(ser)
}

fn topic_column(row: &SqliteRow) -> Result<Topic, StorageError> {
    let raw: String = row.try_get("topic").map_err(ser)?;
    Topic::parse(&raw).map_err(ser)
}

fn owner_column(row: &SqliteRow, column: &'static str) -> Result<Option<OwnerId>, StorageError> {
    row.try_get::<Option<String>, _>(column)
        .map_err(ser)?
        .map(|raw| OwnerId::new(raw).map_err(ser))
        .transpose()
}

pub(crate) fn map_pool_row(row: &SqliteRow) -> Result<PoolQuestionRecord, StorageError> {
    let options = ["option_0", "option_1", "option_2", "option_3"]
        .into_iter()
        .map(|col| row.try_get::<String, _>(col).map_err(ser))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PoolQuestionRecord {
        id: Some(row.try_get("id").map_err(ser)?),
        topic: topic_column(row)?,
        text: row.try_get("question").map_err(ser)?,
        options,
        correct_index: row.try_get("correct_index").map_err(ser)?,
        explanation: row.try_get("explanation").map_err(ser)?,
        origin: parse_column::<QuestionOrigin>(row, "origin")?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_result_row(row: &SqliteRow) -> Result<ResultRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let record = ResultRecord::from_persisted(
        parse_column::<SessionId>(row, "session_id")?,
        topic_column(row)?,
        u8_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        u32_from_i64(
            "correct_count",
            row.try_get::<i64, _>("correct_count").map_err(ser)?,
        )?,
        u32_from_i64(
            "total_count",
            row.try_get::<i64, _>("total_count").map_err(ser)?,
        )?,
        parse_column::<SessionMode>(row, "mode")?,
        parse_column::<Difficulty>(row, "difficulty")?,
        parse_column::<SourceMode>(row, "source")?,
        row.try_get("created_at").map_err(ser)?,
        owner_column(row, "owner_id")?,
    )
    .map_err(ser)?;
    Ok(ResultRow::new(id, record))
}

pub(crate) fn map_feedback_row(row: &SqliteRow) -> Result<Feedback, StorageError> {
    let text: String = row.try_get("text").map_err(ser)?;
    Feedback::new(
        &text,
        owner_column(row, "author_id")?,
        row.try_get("submitted_at").map_err(ser)?,
    )
    .map_err(ser)
}
