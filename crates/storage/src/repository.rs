use async_trait::async_trait;
use quiz_core::model::{AnswerLog, ProgressMap};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::slots::{
    ANSWERS_SLOT, PROGRESS_SLOT, decode_answers, decode_progress, encode_answers, encode_progress,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Durable learner state as written after every mutation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateSnapshot {
    pub answers: AnswerLog,
    pub progress: ProgressMap,
}

/// Durable learner state as read at startup.
///
/// Each slot is independent: a missing progress slot means progress has to be
/// derived fresh, a missing answers slot means an empty history.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RestoredState {
    pub answers: Option<AnswerLog>,
    pub progress: Option<ProgressMap>,
}

impl RestoredState {
    /// Nothing persisted yet.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_none() && self.progress.is_none()
    }
}

impl From<StateSnapshot> for RestoredState {
    fn from(snapshot: StateSnapshot) -> Self {
        Self {
            answers: Some(snapshot.answers),
            progress: Some(snapshot.progress),
        }
    }
}

/// Repository contract for the learner's answer log and progress.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Read both slots.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if a slot cannot be read or decoded.
    async fn load_state(&self) -> Result<RestoredState, StorageError>;

    /// Overwrite both slots with `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be encoded or stored.
    async fn save_state(&self, snapshot: &StateSnapshot) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Slots hold the same JSON payloads the `SQLite` adapter writes.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    slots: Arc<Mutex<HashMap<&'static str, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Raw payload of a slot, if written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn raw_slot(&self, slot: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .slots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(slot).cloned())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_state(&self) -> Result<RestoredState, StorageError> {
        let guard = self
            .slots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let answers = guard
            .get(ANSWERS_SLOT)
            .map(|payload| decode_answers(payload))
            .transpose()?;
        let progress = guard
            .get(PROGRESS_SLOT)
            .map(|payload| decode_progress(payload))
            .transpose()?;
        Ok(RestoredState { answers, progress })
    }

    async fn save_state(&self, snapshot: &StateSnapshot) -> Result<(), StorageError> {
        let answers = encode_answers(&snapshot.answers)?;
        let progress = encode_progress(&snapshot.progress)?;
        let mut guard = self
            .slots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(ANSWERS_SLOT, answers);
        guard.insert(PROGRESS_SLOT, progress);
        Ok(())
    }
}

/// Repository handle behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerRecord, ChapterProgress};
    use quiz_core::time::fixed_now;

    fn snapshot() -> StateSnapshot {
        let answers = AnswerLog::from_records(vec![AnswerRecord::new(
            "q1".into(),
            "a".into(),
            true,
            fixed_now(),
        )]);
        let mut progress = ProgressMap::new();
        let chapter: &mut ChapterProgress = progress.chapter_or_create(&"c1".into());
        chapter
            .set_or_create(&"s1".into(), 2)
            .record_attempt(true, fixed_now());
        chapter.recompute_rate();
        StateSnapshot { answers, progress }
    }

    #[tokio::test]
    async fn empty_repository_restores_nothing() {
        let repo = InMemoryRepository::new();
        let restored = repo.load_state().await.unwrap();
        assert!(restored.is_empty());
    }

    #[tokio::test]
    async fn round_trips_both_slots() {
        let repo = InMemoryRepository::new();
        let saved = snapshot();
        repo.save_state(&saved).await.unwrap();

        let restored = repo.load_state().await.unwrap();
        assert_eq!(restored, RestoredState::from(saved));
        assert!(repo.raw_slot(ANSWERS_SLOT).unwrap().is_some());
        assert!(repo.raw_slot(PROGRESS_SLOT).unwrap().is_some());
    }
}
