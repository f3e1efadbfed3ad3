use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{ChapterId, OptionId, QuestionId, QuestionSetId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Structural problems found while loading a catalog.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("duplicate chapter id: {0}")]
    DuplicateChapter(ChapterId),

    #[error("duplicate question set id {set} in chapter {chapter}")]
    DuplicateQuestionSet {
        chapter: ChapterId,
        set: QuestionSetId,
    },

    #[error("duplicate question id {question} in question set {set}")]
    DuplicateQuestion {
        set: QuestionSetId,
        question: QuestionId,
    },

    #[error("duplicate option id {option} in question {question}")]
    DuplicateOption {
        question: QuestionId,
        option: OptionId,
    },

    #[error("question {0} has no options")]
    NoOptions(QuestionId),

    #[error("question {question} names unknown correct option {option}")]
    UnknownCorrectOption {
        question: QuestionId,
        option: OptionId,
    },
}

//
// ─── LEAF ENTITIES ─────────────────────────────────────────────────────────────
//

/// One selectable answer of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    id: OptionId,
    text: String,
}

impl AnswerOption {
    #[must_use]
    pub fn new(id: impl Into<OptionId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &OptionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A multiple-choice question with exactly one correct option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<AnswerOption>,
    correct_option_id: OptionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

impl Question {
    #[must_use]
    pub fn new(
        id: impl Into<QuestionId>,
        prompt: impl Into<String>,
        options: Vec<AnswerOption>,
        correct_option_id: impl Into<OptionId>,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            options,
            correct_option_id: correct_option_id.into(),
            explanation: None,
        }
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn correct_option_id(&self) -> &OptionId {
        &self.correct_option_id
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Returns true if `selected` is this question's correct option.
    #[must_use]
    pub fn is_correct(&self, selected: &OptionId) -> bool {
        &self.correct_option_id == selected
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.options.is_empty() {
            return Err(CatalogError::NoOptions(self.id.clone()));
        }
        let mut seen = HashSet::with_capacity(self.options.len());
        for option in &self.options {
            if !seen.insert(option.id()) {
                return Err(CatalogError::DuplicateOption {
                    question: self.id.clone(),
                    option: option.id().clone(),
                });
            }
        }
        if !seen.contains(&self.correct_option_id) {
            return Err(CatalogError::UnknownCorrectOption {
                question: self.id.clone(),
                option: self.correct_option_id.clone(),
            });
        }
        Ok(())
    }
}

//
// ─── QUESTION SETS ─────────────────────────────────────────────────────────────
//

/// Quiz mode of a question set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionSetKind {
    /// Regular practice questions following a lesson.
    #[default]
    Practice,
    /// Revisits earlier material.
    Review,
    /// Closing test of a chapter.
    Exam,
}

impl QuestionSetKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Practice => "practice",
            Self::Review => "review",
            Self::Exam => "exam",
        }
    }
}

/// Reading material a question set is based on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSet {
    id: QuestionSetId,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    kind: QuestionSetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reference_article: Option<Article>,
    questions: Vec<Question>,
}

impl QuestionSet {
    #[must_use]
    pub fn new(
        id: impl Into<QuestionSetId>,
        title: impl Into<String>,
        kind: QuestionSetKind,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            kind,
            reference_article: None,
            questions,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_article(mut self, article: Article) -> Self {
        self.reference_article = Some(article);
        self
    }

    #[must_use]
    pub fn id(&self) -> &QuestionSetId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn kind(&self) -> QuestionSetKind {
        self.kind
    }

    #[must_use]
    pub fn reference_article(&self) -> Option<&Article> {
        self.reference_article.as_ref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn contains_question(&self, id: &QuestionId) -> bool {
        self.question(id).is_some()
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::with_capacity(self.questions.len());
        for question in &self.questions {
            if !seen.insert(question.id()) {
                return Err(CatalogError::DuplicateQuestion {
                    set: self.id.clone(),
                    question: question.id().clone(),
                });
            }
            question.validate()?;
        }
        Ok(())
    }
}

//
// ─── CHAPTERS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    id: ChapterId,
    title: String,
    #[serde(default)]
    description: String,
    question_sets: Vec<QuestionSet>,
}

impl Chapter {
    #[must_use]
    pub fn new(
        id: impl Into<ChapterId>,
        title: impl Into<String>,
        question_sets: Vec<QuestionSet>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            question_sets,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn id(&self) -> &ChapterId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn question_sets(&self) -> &[QuestionSet] {
        &self.question_sets
    }

    #[must_use]
    pub fn question_set(&self, id: &QuestionSetId) -> Option<&QuestionSet> {
        self.question_sets.iter().find(|s| s.id() == id)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::with_capacity(self.question_sets.len());
        for set in &self.question_sets {
            if !seen.insert(set.id()) {
                return Err(CatalogError::DuplicateQuestionSet {
                    chapter: self.id.clone(),
                    set: set.id().clone(),
                });
            }
            set.validate()?;
        }
        Ok(())
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

#[derive(Deserialize)]
struct CatalogDocument {
    chapters: Vec<Chapter>,
}

impl TryFrom<CatalogDocument> for Catalog {
    type Error = CatalogError;

    fn try_from(doc: CatalogDocument) -> Result<Self, Self::Error> {
        Catalog::new(doc.chapters)
    }
}

/// Immutable tree of chapters, question sets, questions and options.
///
/// Sibling ids are unique and every question's correct option exists; both
/// are checked once in [`Catalog::new`] (and on deserialization).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "CatalogDocument")]
pub struct Catalog {
    chapters: Vec<Chapter>,
}

impl Catalog {
    /// Builds a validated catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` on duplicate sibling ids, questions without
    /// options, or a correct option id that names none of the options.
    pub fn new(chapters: Vec<Chapter>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(chapters.len());
        for chapter in &chapters {
            if !seen.insert(chapter.id()) {
                return Err(CatalogError::DuplicateChapter(chapter.id().clone()));
            }
            chapter.validate()?;
        }
        Ok(Self { chapters })
    }

    #[must_use]
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    #[must_use]
    pub fn chapter(&self, id: &ChapterId) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id() == id)
    }

    #[must_use]
    pub fn question_set(&self, chapter: &ChapterId, set: &QuestionSetId) -> Option<&QuestionSet> {
        self.chapter(chapter).and_then(|c| c.question_set(set))
    }

    /// First question set of the first chapter that has one.
    #[must_use]
    pub fn first_question_set(&self) -> Option<(&Chapter, &QuestionSet)> {
        self.chapters
            .iter()
            .find_map(|c| c.question_sets().first().map(|s| (c, s)))
    }

    /// Finds a question anywhere in the catalog, returning the first match in
    /// catalog order.
    #[must_use]
    pub fn find_question(&self, id: &QuestionId) -> Option<&Question> {
        self.chapters
            .iter()
            .flat_map(Chapter::question_sets)
            .find_map(|s| s.question(id))
    }

    /// Resolves the question set that follows `set` in `chapter`.
    ///
    /// The next sibling wins; otherwise the first set of the next chapter that
    /// has at least one set. Returns `None` at the end of the catalog or when
    /// the starting position is unknown.
    #[must_use]
    pub fn next_question_set_after(
        &self,
        chapter: &ChapterId,
        set: &QuestionSetId,
    ) -> Option<(&Chapter, &QuestionSet)> {
        let chapter_idx = self.chapters.iter().position(|c| c.id() == chapter)?;
        let current = &self.chapters[chapter_idx];
        let set_idx = current.question_sets().iter().position(|s| s.id() == set)?;

        if let Some(next) = current.question_sets().get(set_idx + 1) {
            return Some((current, next));
        }

        self.chapters[chapter_idx + 1..]
            .iter()
            .find_map(|c| c.question_sets().first().map(|s| (c, s)))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
