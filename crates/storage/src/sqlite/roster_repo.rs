use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{RosterStore, StorageError};

#[async_trait::async_trait]
impl RosterStore for SqliteRepository {
    async fn contains(&self, roll: &str) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM roster WHERE roll = ?1")
            .bind(roll)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(row.is_some())
    }

    async fn replace_all(&self, rolls: &[String]) -> Result<(), StorageError> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query("DELETE FROM roster")
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for roll in rolls {
            sqlx::query("INSERT INTO roster (roll) VALUES (?1) ON CONFLICT(roll) DO NOTHING")
                .bind(roll)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn len(&self) -> Result<usize, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM roster")
            .fetch_one(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let n: i64 = row
            .try_get("n")
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        usize::try_from(n).map_err(|_| StorageError::Serialization(format!("invalid count: {n}")))
    }
}
