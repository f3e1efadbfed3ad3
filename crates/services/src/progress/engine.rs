use std::fmt;
use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::{
    AnswerLog, AnswerRecord, Catalog, Chapter, ChapterId, ChapterProgress, CursorState,
    NavigationCursor, OptionId, ProgressMap, Question, QuestionId, QuestionSet, QuestionSetId,
    SetProgress, question_total,
};
use storage::repository::{RestoredState, StateSnapshot};
use tracing::{debug, info};

use super::outcome::{AdvanceOutcome, SetStatus};
use crate::persistence::StateSink;

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Tracks a learner's way through a catalog and gates progression.
///
/// Holds the answer log, the aggregate progress and the navigation cursor.
/// Every mutating operation hands a full snapshot to the injected
/// [`StateSink`] and returns without waiting for it.
///
/// Operations never fail: a missing selection or an unknown id makes reads
/// return `None`/`false` and turns mutations into no-ops.
pub struct ProgressEngine {
    catalog: Arc<Catalog>,
    answers: AnswerLog,
    progress: ProgressMap,
    cursor: NavigationCursor,
    clock: Clock,
    sink: Arc<dyn StateSink>,
}

impl ProgressEngine {
    /// Builds an engine from a catalog and whatever state was persisted.
    ///
    /// Missing progress is derived fresh from the catalog (every counter at
    /// zero) and persisted right away. Missing answers start an empty log.
    /// The cursor starts unselected.
    pub fn initialize(
        catalog: impl Into<Arc<Catalog>>,
        restored: RestoredState,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        let catalog = catalog.into();
        let answers = restored.answers.unwrap_or_default();
        let (progress, fresh) = match restored.progress {
            Some(progress) => (progress, false),
            None => (ProgressMap::fresh(&catalog), true),
        };

        let engine = Self {
            catalog,
            answers,
            progress,
            cursor: NavigationCursor::new(),
            clock: Clock::default(),
            sink,
        };

        if fresh {
            info!(
                chapters = engine.progress.chapters().len(),
                "derived fresh progress from catalog"
            );
            engine.persist();
        }
        engine
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerLog {
        &self.answers
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressMap {
        &self.progress
    }

    #[must_use]
    pub fn cursor(&self) -> &NavigationCursor {
        &self.cursor
    }

    #[must_use]
    pub fn cursor_state(&self) -> CursorState {
        self.cursor.state()
    }

    #[must_use]
    pub fn chapter_progress(&self, chapter_id: &ChapterId) -> Option<&ChapterProgress> {
        self.progress.chapter(chapter_id)
    }

    #[must_use]
    pub fn set_progress(
        &self,
        chapter_id: &ChapterId,
        question_set_id: &QuestionSetId,
    ) -> Option<&SetProgress> {
        self.progress.set(chapter_id, question_set_id)
    }

    /// Copy of the durable state.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            answers: self.answers.clone(),
            progress: self.progress.clone(),
        }
    }

    //
    // ─── LOOKUPS ───────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn current_chapter(&self) -> Option<&Chapter> {
        self.catalog.chapter(self.cursor.chapter_id()?)
    }

    #[must_use]
    pub fn current_question_set(&self) -> Option<&QuestionSet> {
        let (chapter_id, set_id) = self.cursor.selection()?;
        self.catalog.question_set(chapter_id, set_id)
    }

    /// Question under the cursor, or `None` if any link is unset or unknown.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current_question_set()?
            .questions()
            .get(self.cursor.question_index())
    }

    /// Most recent answer to `question_id`, e.g. to show a prior choice.
    #[must_use]
    pub fn latest_answer(&self, question_id: &QuestionId) -> Option<&AnswerRecord> {
        self.answers.latest_for(question_id)
    }

    /// Lifetime accuracy of `question_id` in percent, over every attempt.
    #[must_use]
    pub fn question_accuracy(&self, question_id: &QuestionId) -> f64 {
        self.answers.accuracy_for(question_id)
    }

    // The current set is searched first so a question id repeated elsewhere in
    // the catalog resolves to the one the learner is looking at.
    fn lookup_question(&self, question_id: &QuestionId) -> Option<&Question> {
        self.current_question_set()
            .and_then(|set| set.question(question_id))
            .or_else(|| self.catalog.find_question(question_id))
    }

    //
    // ─── ANSWERS ───────────────────────────────────────────────────────────────
    //

    /// Records an answer and returns whether it was correct.
    ///
    /// With a known chapter and set selected, the set's counters and the
    /// chapter rate are updated as well; missing progress entries are created from
    /// the catalog. Unknown question ids are ignored and count as incorrect.
    pub fn record_answer(&mut self, question_id: &QuestionId, selected: &OptionId) -> bool {
        let Some(is_correct) = self
            .lookup_question(question_id)
            .map(|question| question.is_correct(selected))
        else {
            debug!(%question_id, "answer for unknown question ignored");
            return false;
        };

        let at = self.clock.stamp();
        self.answers.append(AnswerRecord::new(
            question_id.clone(),
            selected.clone(),
            is_correct,
            at,
        ));

        let selected = self.cursor.selection().and_then(|(chapter_id, set_id)| {
            self.catalog
                .question_set(chapter_id, set_id)
                .map(|set| (chapter_id, set_id, question_total(set.question_count())))
        });
        if let Some((chapter_id, set_id, total)) = selected {
            let chapter = self.progress.chapter_or_create(chapter_id);
            chapter
                .set_or_create(set_id, total)
                .record_attempt(is_correct, at);
            chapter.recompute_rate();
        }

        debug!(%question_id, is_correct, "answer recorded");
        self.persist();
        is_correct
    }

    /// Whether every question of the current set has a correct latest answer.
    ///
    /// Unanswered questions fail the check; an older correct answer does not
    /// help once a newer wrong one exists.
    #[must_use]
    pub fn is_current_set_all_correct(&self) -> bool {
        let Some(set) = self.current_question_set() else {
            return false;
        };
        set.questions().iter().all(|question| {
            self.answers
                .latest_for(question.id())
                .is_some_and(|record| record.is_correct)
        })
    }

    /// Answered/correct counts of the current set by latest attempt.
    #[must_use]
    pub fn current_set_status(&self) -> Option<SetStatus> {
        let set = self.current_question_set()?;
        let mut status = SetStatus {
            total: set.question_count(),
            answered: 0,
            correct: 0,
        };
        for question in set.questions() {
            if let Some(record) = self.answers.latest_for(question.id()) {
                status.answered += 1;
                if record.is_correct {
                    status.correct += 1;
                }
            }
        }
        Some(status)
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// Selects a chapter and clears the question set selection.
    pub fn set_current_chapter(&mut self, chapter_id: impl Into<ChapterId>) {
        self.cursor.select_chapter(chapter_id.into());
    }

    /// Selects a question set and rewinds to its first question.
    pub fn set_current_question_set(&mut self, question_set_id: impl Into<QuestionSetId>) {
        self.cursor.select_question_set(question_set_id.into());
    }

    /// Points the cursor at the first question set of the catalog.
    ///
    /// Returns `false` if the catalog has no question sets.
    pub fn select_first_question_set(&mut self) -> bool {
        let Some((chapter, set)) = self.catalog.first_question_set() else {
            return false;
        };
        self.cursor.jump_to(chapter.id().clone(), set.id().clone());
        true
    }

    pub fn move_to_next_question(&mut self) -> bool {
        let Some(count) = self.current_question_set().map(QuestionSet::question_count) else {
            return false;
        };
        let next = self.cursor.question_index() + 1;
        if next >= count {
            return false;
        }
        self.cursor.set_question_index(next);
        true
    }

    pub fn move_to_previous_question(&mut self) -> bool {
        if self.current_question_set().is_none() {
            return false;
        }
        let Some(previous) = self.cursor.question_index().checked_sub(1) else {
            return false;
        };
        self.cursor.set_question_index(previous);
        true
    }

    /// Moves to `index` within the current set if it is in range.
    pub fn jump_to_question(&mut self, index: usize) -> bool {
        let in_range = self
            .current_question_set()
            .is_some_and(|set| index < set.question_count());
        if in_range {
            self.cursor.set_question_index(index);
        }
        in_range
    }

    /// Applies the gating policy.
    ///
    /// A set that is not fully correct is reset in place. A mastered set moves
    /// the cursor to the next set (same chapter first, then the next chapter
    /// that has any), creating its progress entry if needed. At the end of the
    /// catalog the cursor stays put and `Exhausted` is returned.
    pub fn advance_to_next_question_set(&mut self) -> AdvanceOutcome {
        if !self.is_current_set_all_correct() {
            self.reset_current_set();
            return AdvanceOutcome::Reset;
        }

        let Some((chapter_id, set_id, total)) = self.next_target() else {
            info!("catalog exhausted");
            return AdvanceOutcome::Exhausted;
        };

        let chapter = self.progress.chapter_or_create(&chapter_id);
        let created = chapter.set(&set_id).is_none();
        chapter.set_or_create(&set_id, total);

        self.cursor.jump_to(chapter_id.clone(), set_id.clone());
        debug!(%chapter_id, %set_id, "advanced to next question set");

        if created {
            self.persist();
        }

        AdvanceOutcome::Moved {
            chapter_id,
            question_set_id: set_id,
        }
    }

    /// True once the current set is mastered and nothing follows it.
    #[must_use]
    pub fn is_catalog_exhausted(&self) -> bool {
        self.is_current_set_all_correct() && self.next_target().is_none()
    }

    fn next_target(&self) -> Option<(ChapterId, QuestionSetId, u32)> {
        let (chapter_id, set_id) = self.cursor.selection()?;
        let (chapter, set) = self.catalog.next_question_set_after(chapter_id, set_id)?;
        Some((
            chapter.id().clone(),
            set.id().clone(),
            question_total(set.question_count()),
        ))
    }

    /// Clears the current set's answers and counters and rewinds the cursor.
    ///
    /// No-op unless the selected chapter and set exist in the catalog.
    pub fn reset_current_set(&mut self) {
        let Some((chapter_id, set_id)) = self
            .cursor
            .selection()
            .map(|(chapter, set)| (chapter.clone(), set.clone()))
        else {
            return;
        };

        let catalog = Arc::clone(&self.catalog);
        let Some(set) = catalog.question_set(&chapter_id, &set_id) else {
            debug!(%chapter_id, %set_id, "reset of unknown question set ignored");
            return;
        };
        let total = question_total(set.question_count());

        let removed = self
            .answers
            .remove_questions(|question_id| set.contains_question(question_id));

        let chapter = self.progress.chapter_or_create(&chapter_id);
        chapter.set_or_create(&set_id, total).reset();
        chapter.recompute_rate();

        self.cursor.rewind();
        debug!(%chapter_id, %set_id, removed, "question set reset");
        self.persist();
    }

    fn persist(&self) {
        self.sink.save_state(self.snapshot());
    }
}

impl fmt::Debug for ProgressEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressEngine")
            .field("chapters", &self.catalog.chapters().len())
            .field("answers_len", &self.answers.len())
            .field("cursor", &self.cursor)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerOption, QuestionSetKind};
    use quiz_core::time::{fixed_now, stepping_test_clock};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        saved: Mutex<Vec<StateSnapshot>>,
    }

    impl RecordingSink {
        fn count(&self) -> usize {
            self.saved.lock().unwrap().len()
        }

        fn last(&self) -> StateSnapshot {
            self.saved.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl StateSink for RecordingSink {
        fn save_state(&self, snapshot: StateSnapshot) {
            self.saved.lock().unwrap().push(snapshot);
        }
    }

    fn question(id: &str) -> Question {
        Question::new(
            id,
            format!("Prompt {id}"),
            vec![AnswerOption::new("right", "Right"), AnswerOption::new("wrong", "Wrong")],
            "right",
        )
    }

    fn set(id: &str, questions: &[&str]) -> QuestionSet {
        QuestionSet::new(
            id,
            format!("Set {id}"),
            QuestionSetKind::Practice,
            questions.iter().map(|q| question(q)).collect(),
        )
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Chapter::new("c1", "One", vec![set("s1", &["q1", "q2"]), set("s2", &["q3"])]),
            Chapter::new("c2", "Two", vec![set("s3", &["q4"])]),
        ])
        .unwrap()
    }

    fn engine() -> (ProgressEngine, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let engine = ProgressEngine::initialize(catalog(), RestoredState::empty(), sink.clone())
            .with_clock(stepping_test_clock());
        (engine, sink)
    }

    fn at_s1() -> (ProgressEngine, Arc<RecordingSink>) {
        let (mut engine, sink) = engine();
        engine.set_current_chapter("c1");
        engine.set_current_question_set("s1");
        (engine, sink)
    }

    fn answer(engine: &mut ProgressEngine, q: &str, opt: &str) -> bool {
        engine.record_answer(&q.into(), &opt.into())
    }

    #[test]
    fn fresh_initialize_derives_and_persists_progress() {
        let (engine, sink) = engine();
        assert_eq!(sink.count(), 1);
        let s1 = engine.set_progress(&"c1".into(), &"s1".into()).unwrap();
        assert_eq!(s1.total_questions(), 2);
        assert_eq!(engine.cursor_state(), CursorState::Unselected);
        assert!(engine.current_question().is_none());
    }

    #[test]
    fn restored_progress_is_adopted_without_saving() {
        let sink = Arc::new(RecordingSink::default());
        let mut progress = ProgressMap::new();
        progress
            .chapter_or_create(&"c1".into())
            .set_or_create(&"s1".into(), 2)
            .record_attempt(true, fixed_now());
        let restored = RestoredState {
            answers: None,
            progress: Some(progress.clone()),
        };
        let engine = ProgressEngine::initialize(catalog(), restored, sink.clone());
        assert_eq!(sink.count(), 0);
        assert_eq!(engine.progress(), &progress);
        assert!(engine.answers().is_empty());
    }

    #[test]
    fn counters_track_every_submission() {
        let (mut engine, sink) = at_s1();
        let results = [
            answer(&mut engine, "q1", "right"),
            answer(&mut engine, "q1", "wrong"),
            answer(&mut engine, "q2", "right"),
            answer(&mut engine, "q2", "wrong"),
            answer(&mut engine, "q2", "wrong"),
        ];
        assert_eq!(results, [true, false, true, false, false]);

        let s1 = engine.set_progress(&"c1".into(), &"s1".into()).unwrap();
        assert_eq!(s1.completed_questions(), 5);
        assert_eq!(s1.correct_answers(), 2);
        assert!(s1.correct_answers() <= s1.completed_questions());
        assert!(s1.last_attempt_at().is_some());

        let chapter = engine.chapter_progress(&"c1".into()).unwrap();
        assert!((chapter.total_correct_rate() - 0.4).abs() < 1e-9);
        assert_eq!(chapter.total_correct_rate(), chapter.expected_rate());

        // one save at init plus one per answer
        assert_eq!(sink.count(), 6);
        assert_eq!(sink.last().answers.len(), 5);
    }

    #[test]
    fn answer_without_selection_only_logs() {
        let (mut engine, sink) = engine();
        assert!(answer(&mut engine, "q3", "right"));
        assert_eq!(engine.answers().len(), 1);
        let s2 = engine.set_progress(&"c1".into(), &"s2".into()).unwrap();
        assert_eq!(s2.completed_questions(), 0);
        assert_eq!(sink.count(), 2);
    }

    #[test]
    fn unknown_question_is_ignored() {
        let (mut engine, sink) = at_s1();
        assert!(!answer(&mut engine, "nope", "right"));
        assert!(engine.answers().is_empty());
        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn missing_entries_are_created_on_answer() {
        let sink = Arc::new(RecordingSink::default());
        let restored = RestoredState {
            answers: None,
            progress: Some(ProgressMap::new()),
        };
        let mut engine = ProgressEngine::initialize(catalog(), restored, sink);
        engine.set_current_chapter("c2");
        engine.set_current_question_set("s3");
        answer(&mut engine, "q4", "right");

        let s3 = engine.set_progress(&"c2".into(), &"s3".into()).unwrap();
        assert_eq!(s3.total_questions(), 1);
        assert_eq!(s3.correct_answers(), 1);
    }

    #[test]
    fn intra_set_navigation_is_bounded() {
        let (mut engine, _) = engine();
        assert!(!engine.move_to_next_question());
        assert!(!engine.move_to_previous_question());

        engine.set_current_chapter("c1");
        engine.set_current_question_set("s1");
        assert_eq!(engine.current_question().unwrap().id().as_str(), "q1");
        assert!(!engine.move_to_previous_question());
        assert!(engine.move_to_next_question());
        assert_eq!(engine.current_question().unwrap().id().as_str(), "q2");
        assert!(!engine.move_to_next_question());
        assert!(engine.move_to_previous_question());
        assert_eq!(engine.cursor().question_index(), 0);

        assert!(engine.jump_to_question(1));
        assert!(!engine.jump_to_question(2));
        assert_eq!(engine.cursor().question_index(), 1);
    }

    #[test]
    fn selecting_a_chapter_clears_the_set() {
        let (mut engine, _) = at_s1();
        engine.move_to_next_question();
        engine.set_current_chapter("c2");
        assert_eq!(engine.cursor_state(), CursorState::ChapterSelected);
        assert!(engine.current_question().is_none());
    }

    #[test]
    fn unknown_ids_degrade_to_nothing_selected() {
        let (mut engine, _) = engine();
        engine.set_current_chapter("missing");
        engine.set_current_question_set("s1");
        assert!(engine.current_question().is_none());
        assert!(!engine.is_current_set_all_correct());
        assert!(!engine.move_to_next_question());
    }

    #[test]
    fn latest_wrong_answer_breaks_mastery() {
        let (mut engine, _) = at_s1();
        answer(&mut engine, "q1", "right");
        assert!(!engine.is_current_set_all_correct());
        answer(&mut engine, "q2", "right");
        assert!(engine.is_current_set_all_correct());
        answer(&mut engine, "q1", "wrong");
        assert!(!engine.is_current_set_all_correct());

        let status = engine.current_set_status().unwrap();
        assert_eq!(status.total, 2);
        assert_eq!(status.answered, 2);
        assert_eq!(status.correct, 1);
        assert!(!status.is_mastered());
    }

    #[test]
    fn advancing_an_unmastered_set_resets_it() {
        let (mut engine, sink) = at_s1();
        answer(&mut engine, "q1", "right");
        answer(&mut engine, "q2", "wrong");
        engine.move_to_next_question();
        engine.set_current_chapter("c2");
        engine.set_current_question_set("s3");
        answer(&mut engine, "q4", "wrong");
        engine.set_current_chapter("c1");
        engine.set_current_question_set("s1");
        engine.move_to_next_question();
        let saves = sink.count();

        let outcome = engine.advance_to_next_question_set();
        assert_eq!(outcome, AdvanceOutcome::Reset);
        assert!(outcome.advanced());
        assert!(outcome.was_reset());

        let (chapter, set) = engine.cursor().selection().unwrap();
        assert_eq!((chapter.as_str(), set.as_str()), ("c1", "s1"));
        assert_eq!(engine.cursor().question_index(), 0);

        let s1 = engine.set_progress(&"c1".into(), &"s1".into()).unwrap();
        assert_eq!((s1.completed_questions(), s1.correct_answers()), (0, 0));
        assert_eq!(s1.total_questions(), 2);
        assert_eq!(engine.chapter_progress(&"c1".into()).unwrap().total_correct_rate(), 0.0);

        // answers of other sets survive
        assert_eq!(engine.answers().len(), 1);
        assert_eq!(engine.answers().records()[0].question_id.as_str(), "q4");
        assert_eq!(sink.count(), saves + 1);
    }

    #[test]
    fn unknown_selection_leaves_progress_alone() {
        let (mut engine, sink) = engine();
        engine.set_current_chapter("ghost");
        engine.set_current_question_set("nope");
        let before = engine.progress().clone();

        assert!(answer(&mut engine, "q1", "right"));
        assert_eq!(engine.answers().len(), 1);
        assert!(engine.chapter_progress(&"ghost".into()).is_none());
        assert_eq!(engine.progress(), &before);

        let saves = sink.count();
        assert_eq!(engine.advance_to_next_question_set(), AdvanceOutcome::Reset);
        assert!(engine.chapter_progress(&"ghost".into()).is_none());
        assert_eq!(engine.answers().len(), 1);
        assert_eq!(sink.count(), saves);
    }

    #[test]
    fn reset_without_selection_is_a_noop() {
        let (mut engine, sink) = engine();
        answer(&mut engine, "q1", "right");
        engine.reset_current_set();
        assert_eq!(engine.answers().len(), 1);
        assert_eq!(sink.count(), 2);
    }

    #[test]
    fn accuracy_uses_lifetime_history() {
        let (mut engine, _) = at_s1();
        answer(&mut engine, "q1", "right");
        answer(&mut engine, "q1", "right");
        answer(&mut engine, "q1", "wrong");
        let accuracy = engine.question_accuracy(&"q1".into());
        assert!((accuracy - 66.666_666).abs() < 1e-3);
        assert_eq!(engine.question_accuracy(&"q2".into()), 0.0);
        assert_eq!(
            engine.latest_answer(&"q1".into()).unwrap().selected_option_id,
            OptionId::new("wrong")
        );
    }

    #[test]
    fn end_of_catalog_is_reported_as_exhausted() {
        let (mut engine, _) = engine();
        engine.set_current_chapter("c2");
        engine.set_current_question_set("s3");
        answer(&mut engine, "q4", "right");
        assert!(engine.is_catalog_exhausted());

        let outcome = engine.advance_to_next_question_set();
        assert_eq!(outcome, AdvanceOutcome::Exhausted);
        assert!(outcome.was_reset());
        assert!(outcome.is_exhausted());

        let (chapter, set) = engine.cursor().selection().unwrap();
        assert_eq!((chapter.as_str(), set.as_str()), ("c2", "s3"));
        // nothing was reset
        assert_eq!(engine.answers().len(), 1);
    }

    #[test]
    fn select_first_question_set_starts_at_root() {
        let (mut engine, _) = engine();
        assert!(engine.select_first_question_set());
        assert_eq!(engine.current_question().unwrap().id().as_str(), "q1");
        assert_eq!(engine.current_chapter().unwrap().id().as_str(), "c1");
    }
}
