use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{OptionId, QuestionId};

//
// ─── ANSWER RECORD ────────────────────────────────────────────────────────────
//

/// A single submitted answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub selected_option_id: OptionId,
    pub is_correct: bool,
    pub timestamp: DateTime<Utc>,
}

impl AnswerRecord {
    #[must_use]
    pub fn new(
        question_id: QuestionId,
        selected_option_id: OptionId,
        is_correct: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            question_id,
            selected_option_id,
            is_correct,
            timestamp,
        }
    }
}

//
// ─── ANSWER LOG ───────────────────────────────────────────────────────────────
//

/// Append-only history of answers in submission order.
///
/// Derived facts (latest answer, accuracy) are computed on demand from the
/// records; nothing is cached next to them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerLog {
    records: Vec<AnswerRecord>,
}

impl AnswerLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_records(records: Vec<AnswerRecord>) -> Self {
        Self { records }
    }

    pub fn append(&mut self, record: AnswerRecord) {
        self.records.push(record);
    }

    #[must_use]
    pub fn records(&self) -> &[AnswerRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records for `question`, oldest first.
    pub fn attempts_for<'a>(
        &'a self,
        question: &'a QuestionId,
    ) -> impl Iterator<Item = &'a AnswerRecord> + 'a {
        self.records.iter().filter(move |r| &r.question_id == question)
    }

    /// Most recent record for `question` by timestamp.
    ///
    /// Records sharing a timestamp resolve to the one appended last.
    #[must_use]
    pub fn latest_for(&self, question: &QuestionId) -> Option<&AnswerRecord> {
        self.records
            .iter()
            .filter(|r| &r.question_id == question)
            .fold(None, |latest: Option<&AnswerRecord>, record| match latest {
                Some(current) if current.timestamp > record.timestamp => Some(current),
                _ => Some(record),
            })
    }

    /// Lifetime accuracy for `question` as a percentage in `[0, 100]`.
    ///
    /// Returns `0.0` if the question was never attempted.
    #[must_use]
    pub fn accuracy_for(&self, question: &QuestionId) -> f64 {
        let (attempts, correct) = self
            .attempts_for(question)
            .fold((0_u32, 0_u32), |(total, ok), r| {
                (total + 1, ok + u32::from(r.is_correct))
            });
        if attempts == 0 {
            return 0.0;
        }
        100.0 * f64::from(correct) / f64::from(attempts)
    }

    /// Drops every record whose question matches `belongs`. Returns how many
    /// records were removed.
    pub fn remove_questions<F>(&mut self, mut belongs: F) -> usize
    where
        F: FnMut(&QuestionId) -> bool,
    {
        let before = self.records.len();
        self.records.retain(|r| !belongs(&r.question_id));
        before - self.records.len()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
