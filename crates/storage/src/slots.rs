//! Named storage slots and their JSON payloads.
//!
//! Durable state lives in exactly two slots: the answer log and the chapter
//! progress map. Every adapter stores the same payload format so state can be
//! moved between backends.

use quiz_core::model::{AnswerLog, ProgressMap};

use crate::repository::StorageError;

/// Slot holding the serialized `AnswerRecord` array.
pub const ANSWERS_SLOT: &str = "userAnswers";

/// Slot holding the serialized chapter id → chapter progress mapping.
pub const PROGRESS_SLOT: &str = "chapterProgress";

fn ser<E: core::fmt::Display>(slot: &str, e: E) -> StorageError {
    StorageError::Serialization(format!("{slot}: {e}"))
}

/// Encodes the answer log payload.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if JSON encoding fails.
pub fn encode_answers(answers: &AnswerLog) -> Result<String, StorageError> {
    serde_json::to_string(answers).map_err(|e| ser(ANSWERS_SLOT, e))
}

/// Decodes the answer log payload.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the payload is not a valid answer log.
pub fn decode_answers(payload: &str) -> Result<AnswerLog, StorageError> {
    serde_json::from_str(payload).map_err(|e| ser(ANSWERS_SLOT, e))
}

/// Encodes the progress map payload.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if JSON encoding fails.
pub fn encode_progress(progress: &ProgressMap) -> Result<String, StorageError> {
    serde_json::to_string(progress).map_err(|e| ser(PROGRESS_SLOT, e))
}

/// Decodes the progress map payload.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the payload is not a valid progress map.
pub fn decode_progress(payload: &str) -> Result<ProgressMap, StorageError> {
    serde_json::from_str(payload).map_err(|e| ser(PROGRESS_SLOT, e))
}
