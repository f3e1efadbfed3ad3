#![forbid(unsafe_code)]

pub mod repository;
pub mod slots;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, ProgressRepository, RestoredState, StateSnapshot, Storage, StorageError,
};
