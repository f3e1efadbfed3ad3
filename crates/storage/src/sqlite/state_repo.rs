use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{ProgressRepository, RestoredState, StateSnapshot, StorageError};
use crate::slots::{
    ANSWERS_SLOT, PROGRESS_SLOT, decode_answers, decode_progress, encode_answers, encode_progress,
};

impl SqliteRepository {
    async fn read_slot(&self, slot: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT payload FROM state_slots WHERE slot = ?1")
            .bind(slot)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|row| {
            row.try_get::<String, _>("payload")
                .map_err(|e| StorageError::Serialization(e.to_string()))
        })
        .transpose()
    }
}

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_state(&self) -> Result<RestoredState, StorageError> {
        let answers = self
            .read_slot(ANSWERS_SLOT)
            .await?
            .map(|payload| decode_answers(&payload))
            .transpose()?;
        let progress = self
            .read_slot(PROGRESS_SLOT)
            .await?
            .map(|payload| decode_progress(&payload))
            .transpose()?;
        Ok(RestoredState { answers, progress })
    }

    async fn save_state(&self, snapshot: &StateSnapshot) -> Result<(), StorageError> {
        let answers = encode_answers(&snapshot.answers)?;
        let progress = encode_progress(&snapshot.progress)?;
        let now = Utc::now();

        // Both slots change together so a reader never sees a log that
        // disagrees with the counters.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for (slot, payload) in [(ANSWERS_SLOT, answers), (PROGRESS_SLOT, progress)] {
            sqlx::query(
                r"
                INSERT INTO state_slots (slot, payload, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(slot) DO UPDATE SET
                    payload = excluded.payload,
                    updated_at = excluded.updated_at
                ",
            )
            .bind(slot)
            .bind(payload)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
