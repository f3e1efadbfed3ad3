mod engine;
mod outcome;

pub use engine::ProgressEngine;
pub use outcome::{AdvanceOutcome, SetStatus};
