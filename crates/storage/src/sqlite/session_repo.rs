use std::collections::{BTreeMap, BTreeSet};

use exam_core::model::{OptionIndex, QuestionId};
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{SessionRecord, SessionStore, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionRecord, StorageError> {
    let roll: String = row.try_get("roll").map_err(ser)?;
    let answers_json: String = row.try_get("answers").map_err(ser)?;
    let marked_json: String = row.try_get("marked").map_err(ser)?;
    let current_index: i64 = row.try_get("current_index").map_err(ser)?;
    let deadline = row.try_get("deadline").map_err(ser)?;
    let saved_at = row.try_get("saved_at").map_err(ser)?;

    let answers: BTreeMap<QuestionId, OptionIndex> =
        serde_json::from_str(&answers_json).map_err(ser)?;
    let marked: BTreeSet<QuestionId> = serde_json::from_str(&marked_json).map_err(ser)?;
    let current_index = usize::try_from(current_index)
        .map_err(|_| StorageError::Serialization(format!("invalid current_index: {current_index}")))?;

    Ok(SessionRecord {
        roll,
        answers,
        marked,
        current_index,
        deadline,
        saved_at,
    })
}

#[async_trait::async_trait]
impl SessionStore for SqliteRepository {
    async fn load(&self, roll: &str) -> Result<Option<SessionRecord>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT roll, answers, marked, current_index, deadline, saved_at
                FROM exam_sessions
                WHERE roll = ?1
            ",
        )
        .bind(roll)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_session_row).transpose()
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StorageError> {
        let answers = serde_json::to_string(&record.answers).map_err(ser)?;
        let marked = serde_json::to_string(&record.marked).map_err(ser)?;
        let current_index = i64::try_from(record.current_index)
            .map_err(|_| StorageError::Serialization("current_index overflow".into()))?;

        // One UPSERT per state change: the whole record lands atomically.
        sqlx::query(
            r"
                INSERT INTO exam_sessions (
                    roll, answers, marked, current_index, deadline, saved_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(roll) DO UPDATE SET
                    answers = excluded.answers,
                    marked = excluded.marked,
                    current_index = excluded.current_index,
                    deadline = excluded.deadline,
                    saved_at = excluded.saved_at
            ",
        )
        .bind(&record.roll)
        .bind(answers)
        .bind(marked)
        .bind(current_index)
        .bind(record.deadline)
        .bind(record.saved_at)
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn clear(&self, roll: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM exam_sessions WHERE roll = ?1")
            .bind(roll)
            .execute(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}
