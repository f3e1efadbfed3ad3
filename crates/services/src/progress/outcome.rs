use quiz_core::model::{ChapterId, QuestionSetId};
use serde::Serialize;

/// Result of asking the engine to move past the current question set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum AdvanceOutcome {
    /// The set was mastered and the cursor now points at the next one.
    #[serde(rename_all = "camelCase")]
    Moved {
        chapter_id: ChapterId,
        question_set_id: QuestionSetId,
    },
    /// The set was not fully correct; its answers and counters were cleared.
    Reset,
    /// The set was mastered but is the last one in the catalog.
    Exhausted,
}

impl AdvanceOutcome {
    /// The request was handled. Always true; the interesting part is
    /// [`AdvanceOutcome::was_reset`].
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn advanced(&self) -> bool {
        true
    }

    /// True unless the cursor moved to a new set.
    ///
    /// Catalog exhaustion also reports true here; use
    /// [`AdvanceOutcome::is_exhausted`] to tell it apart from a real reset.
    #[must_use]
    pub fn was_reset(&self) -> bool {
        !matches!(self, Self::Moved { .. })
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

/// Latest-attempt view of a question set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetStatus {
    pub total: usize,
    pub answered: usize,
    pub correct: usize,
}

impl SetStatus {
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.answered)
    }

    /// Every question's latest answer is correct.
    #[must_use]
    pub fn is_mastered(&self) -> bool {
        self.correct == self.total
    }
}
