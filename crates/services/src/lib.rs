#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod persistence;
pub mod progress;
pub mod progress_service;

pub use quiz_core::Clock;

pub use catalog::CatalogLoader;
pub use error::{CatalogLoadError, ProgressServiceError};
pub use persistence::{PersistenceTask, PersistenceWriter, RetryPolicy, StateSink};
pub use progress::{AdvanceOutcome, ProgressEngine, SetStatus};
pub use progress_service::ProgressService;
