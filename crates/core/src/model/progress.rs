use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::model::catalog::{Catalog, Chapter};
use crate::model::ids::{ChapterId, QuestionSetId};

//
// ─── SET PROGRESS ─────────────────────────────────────────────────────────────
//

/// Answer counters for one question set.
///
/// `correct_answers <= completed_questions` holds for every value built
/// through this type's methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetProgress {
    question_set_id: QuestionSetId,
    total_questions: u32,
    correct_answers: u32,
    completed_questions: u32,
    #[serde(default, rename = "lastAttemptTimestamp")]
    last_attempt_at: Option<DateTime<Utc>>,
}

impl SetProgress {
    /// Zeroed counters for a set with `total_questions` questions.
    #[must_use]
    pub fn new(question_set_id: QuestionSetId, total_questions: u32) -> Self {
        Self {
            question_set_id,
            total_questions,
            correct_answers: 0,
            completed_questions: 0,
            last_attempt_at: None,
        }
    }

    #[must_use]
    pub fn question_set_id(&self) -> &QuestionSetId {
        &self.question_set_id
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn completed_questions(&self) -> u32 {
        self.completed_questions
    }

    #[must_use]
    pub fn last_attempt_at(&self) -> Option<DateTime<Utc>> {
        self.last_attempt_at
    }

    /// Counts one submitted answer.
    pub fn record_attempt(&mut self, is_correct: bool, at: DateTime<Utc>) {
        self.completed_questions = self.completed_questions.saturating_add(1);
        if is_correct {
            self.correct_answers = self.correct_answers.saturating_add(1);
        }
        self.last_attempt_at = Some(at);
    }

    /// Zeroes the answer counters. `total_questions` and the last attempt
    /// time are kept.
    pub fn reset(&mut self) {
        self.completed_questions = 0;
        self.correct_answers = 0;
    }
}

//
// ─── CHAPTER PROGRESS ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterProgress {
    chapter_id: ChapterId,
    question_sets: BTreeMap<QuestionSetId, SetProgress>,
    total_correct_rate: f64,
}

impl ChapterProgress {
    #[must_use]
    pub fn new(chapter_id: ChapterId) -> Self {
        Self {
            chapter_id,
            question_sets: BTreeMap::new(),
            total_correct_rate: 0.0,
        }
    }

    /// Zeroed progress for every question set of `chapter`.
    #[must_use]
    pub fn fresh(chapter: &Chapter) -> Self {
        let mut progress = Self::new(chapter.id().clone());
        for set in chapter.question_sets() {
            progress.question_sets.insert(
                set.id().clone(),
                SetProgress::new(set.id().clone(), question_total(set.question_count())),
            );
        }
        progress
    }

    #[must_use]
    pub fn chapter_id(&self) -> &ChapterId {
        &self.chapter_id
    }

    #[must_use]
    pub fn question_sets(&self) -> &BTreeMap<QuestionSetId, SetProgress> {
        &self.question_sets
    }

    #[must_use]
    pub fn set(&self, id: &QuestionSetId) -> Option<&SetProgress> {
        self.question_sets.get(id)
    }

    /// Returns the entry for `id`, creating it with `total_questions` if it is
    /// missing. An existing entry is returned untouched.
    pub fn set_or_create(&mut self, id: &QuestionSetId, total_questions: u32) -> &mut SetProgress {
        self.question_sets
            .entry(id.clone())
            .or_insert_with(|| SetProgress::new(id.clone(), total_questions))
    }

    /// Stored ratio of correct to completed answers across all sets.
    #[must_use]
    pub fn total_correct_rate(&self) -> f64 {
        self.total_correct_rate
    }

    /// Derives the correct-rate from the current set counters.
    #[must_use]
    pub fn expected_rate(&self) -> f64 {
        let (correct, completed) = self
            .question_sets
            .values()
            .fold((0_u64, 0_u64), |(c, d), p| {
                (
                    c + u64::from(p.correct_answers),
                    d + u64::from(p.completed_questions),
                )
            });
        if completed == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = correct as f64 / completed as f64;
        rate
    }

    /// Recomputes the stored rate from scratch.
    pub fn recompute_rate(&mut self) {
        self.total_correct_rate = self.expected_rate();
    }
}

//
// ─── PROGRESS MAP ─────────────────────────────────────────────────────────────
//

/// Chapter id to chapter progress, in id order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressMap {
    chapters: BTreeMap<ChapterId, ChapterProgress>,
}

impl ProgressMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroed progress for every chapter/question-set pair of `catalog`.
    #[must_use]
    pub fn fresh(catalog: &Catalog) -> Self {
        let chapters = catalog
            .chapters()
            .iter()
            .map(|c| (c.id().clone(), ChapterProgress::fresh(c)))
            .collect();
        Self { chapters }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    #[must_use]
    pub fn chapters(&self) -> &BTreeMap<ChapterId, ChapterProgress> {
        &self.chapters
    }

    #[must_use]
    pub fn chapter(&self, id: &ChapterId) -> Option<&ChapterProgress> {
        self.chapters.get(id)
    }

    #[must_use]
    pub fn set(&self, chapter: &ChapterId, set: &QuestionSetId) -> Option<&SetProgress> {
        self.chapter(chapter).and_then(|c| c.set(set))
    }

    /// Returns the entry for `id`, creating an empty one if it is missing.
    pub fn chapter_or_create(&mut self, id: &ChapterId) -> &mut ChapterProgress {
        match self.chapters.entry(id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(ChapterProgress::new(id.clone())),
        }
    }
}

/// Question count of a set as stored in progress counters.
#[must_use]
pub fn question_total(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
