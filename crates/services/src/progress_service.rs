use std::sync::Arc;

use quiz_core::model::{Catalog, ProgressMap};
use storage::repository::ProgressRepository;
use tracing::info;

use crate::Clock;
use crate::error::ProgressServiceError;
use crate::persistence::{PersistenceTask, PersistenceWriter, RetryPolicy};
use crate::progress::ProgressEngine;

/// Wires a `ProgressEngine` to a repository.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    repo: Arc<dyn ProgressRepository>,
    retry: RetryPolicy,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn ProgressRepository>) -> Self {
        Self {
            clock,
            repo,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Load persisted state and build an engine backed by a background writer.
    ///
    /// Must be called from within a tokio runtime. Await
    /// [`PersistenceTask::flushed`] after dropping the engine to make sure the
    /// last snapshot reached storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if persisted state cannot be read.
    pub async fn open(
        &self,
        catalog: Catalog,
    ) -> Result<(ProgressEngine, PersistenceTask), ProgressServiceError> {
        let restored = self.repo.load_state().await?;
        info!(
            answers = restored.answers.as_ref().map_or(0, |a| a.len()),
            has_progress = restored.progress.is_some(),
            "loaded learner state"
        );

        let (writer, task) = PersistenceWriter::spawn(Arc::clone(&self.repo), self.retry);
        let engine =
            ProgressEngine::initialize(catalog, restored, Arc::new(writer)).with_clock(self.clock);
        Ok((engine, task))
    }

    /// Persisted progress, or an empty map if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if persisted state cannot be read.
    pub async fn load_progress(&self) -> Result<ProgressMap, ProgressServiceError> {
        let restored = self.repo.load_state().await?;
        Ok(restored.progress.unwrap_or_default())
    }
}
