use crate::model::ids::{ChapterId, QuestionSetId};

/// Where the learner currently is in the catalog.
///
/// The cursor stores ids without checking them against a catalog; lookups
/// through an unknown id simply find nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NavigationCursor {
    chapter_id: Option<ChapterId>,
    question_set_id: Option<QuestionSetId>,
    question_index: usize,
}

/// Coarse navigation state derived from a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Unselected,
    ChapterSelected,
    SetSelected { index: usize },
}

impl NavigationCursor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn chapter_id(&self) -> Option<&ChapterId> {
        self.chapter_id.as_ref()
    }

    #[must_use]
    pub fn question_set_id(&self) -> Option<&QuestionSetId> {
        self.question_set_id.as_ref()
    }

    #[must_use]
    pub fn question_index(&self) -> usize {
        self.question_index
    }

    #[must_use]
    pub fn state(&self) -> CursorState {
        match (&self.chapter_id, &self.question_set_id) {
            (_, Some(_)) => CursorState::SetSelected {
                index: self.question_index,
            },
            (Some(_), None) => CursorState::ChapterSelected,
            (None, None) => CursorState::Unselected,
        }
    }

    /// Both a chapter and a question set are selected.
    #[must_use]
    pub fn selection(&self) -> Option<(&ChapterId, &QuestionSetId)> {
        self.chapter_id.as_ref().zip(self.question_set_id.as_ref())
    }

    pub fn select_chapter(&mut self, chapter_id: ChapterId) {
        self.chapter_id = Some(chapter_id);
        self.question_set_id = None;
        self.question_index = 0;
    }

    pub fn select_question_set(&mut self, question_set_id: QuestionSetId) {
        self.question_set_id = Some(question_set_id);
        self.question_index = 0;
    }

    /// Moves to the first question of `set` in `chapter`.
    pub fn jump_to(&mut self, chapter_id: ChapterId, question_set_id: QuestionSetId) {
        self.chapter_id = Some(chapter_id);
        self.question_set_id = Some(question_set_id);
        self.question_index = 0;
    }

    pub fn set_question_index(&mut self, index: usize) {
        self.question_index = index;
    }

    pub fn rewind(&mut self) {
        self.question_index = 0;
    }
}
