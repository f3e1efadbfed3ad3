//! Fire-and-forget persistence for engine state.
//!
//! The engine is synchronous and never waits on storage. It hands every new
//! snapshot to a [`StateSink`]; the production sink forwards snapshots over a
//! channel to a background task that writes them through a
//! [`ProgressRepository`], retrying and logging failures on its own.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use storage::repository::{ProgressRepository, StateSnapshot};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Receives the engine's state after every mutation.
///
/// Implementations must return promptly and must not report failures back to
/// the engine.
pub trait StateSink: Send + Sync {
    fn save_state(&self, snapshot: StateSnapshot);
}

//
// ─── RETRY ─────────────────────────────────────────────────────────────────────
//

/// Capped exponential backoff for storage writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(500),
            jitter_max: Some(Duration::from_millis(25)),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter_max: None,
        }
    }

    fn jitter(&self) -> Duration {
        match self.jitter_max {
            Some(max) if !max.is_zero() => {
                let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
                Duration::from_millis(rand::random_range(0..=max_ms))
            }
            _ => Duration::ZERO,
        }
    }

    /// Runs `op` until it succeeds or the attempts are used up.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt.
    pub async fn run<F, Fut, T, E>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        let mut backoff = self.base_backoff;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts => {
                    debug!(attempt, error = %err, "storage write failed, retrying");
                    tokio::time::sleep(backoff + self.jitter()).await;
                    backoff = (backoff * 2).min(self.max_backoff);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

//
// ─── WRITER ────────────────────────────────────────────────────────────────────
//

/// Sink handle that queues snapshots for the background writer.
#[derive(Clone, Debug)]
pub struct PersistenceWriter {
    tx: mpsc::UnboundedSender<StateSnapshot>,
}

/// The background writer task.
#[derive(Debug)]
pub struct PersistenceTask {
    handle: JoinHandle<()>,
}

impl PersistenceWriter {
    /// Spawns the writer task on the current tokio runtime.
    ///
    /// The task ends once every `PersistenceWriter` clone is dropped and the
    /// queue is drained.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn(repo: Arc<dyn ProgressRepository>, retry: RetryPolicy) -> (Self, PersistenceTask) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(repo, rx, retry));
        (Self { tx }, PersistenceTask { handle })
    }
}

impl StateSink for PersistenceWriter {
    fn save_state(&self, snapshot: StateSnapshot) {
        if self.tx.send(snapshot).is_err() {
            warn!("persistence writer has stopped; snapshot dropped");
        }
    }
}

impl PersistenceTask {
    /// Waits until the queue is drained and the task has exited.
    ///
    /// Drop every writer handle (usually by dropping the engine) first,
    /// otherwise this waits forever.
    pub async fn flushed(self) {
        if let Err(err) = self.handle.await {
            warn!(error = %err, "persistence writer task failed");
        }
    }
}

async fn run_writer(
    repo: Arc<dyn ProgressRepository>,
    mut rx: mpsc::UnboundedReceiver<StateSnapshot>,
    retry: RetryPolicy,
) {
    while let Some(mut snapshot) = rx.recv().await {
        // Each snapshot is a full state; only the newest queued one matters.
        let mut skipped = 0_usize;
        while let Ok(newer) = rx.try_recv() {
            snapshot = newer;
            skipped += 1;
        }

        let repo_ref = repo.as_ref();
        let snapshot_ref = &snapshot;
        match retry.run(move || repo_ref.save_state(snapshot_ref)).await {
            Ok(()) => debug!(
                answers = snapshot.answers.len(),
                skipped, "learner state persisted"
            ),
            Err(err) => warn!(error = %err, "failed to persist learner state"),
        }
    }
    debug!("persistence writer drained");
}
