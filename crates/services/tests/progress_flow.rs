use std::sync::Arc;

use quiz_core::model::{
    AnswerLog, AnswerOption, Catalog, Chapter, ProgressMap, Question, QuestionSet, QuestionSetKind,
};
use quiz_core::time::stepping_test_clock;
use services::{AdvanceOutcome, ProgressService, RetryPolicy};
use storage::repository::{InMemoryRepository, ProgressRepository, StateSnapshot};

fn question(id: &str) -> Question {
    Question::new(
        id,
        format!("Prompt {id}"),
        vec![AnswerOption::new("a", "Right"), AnswerOption::new("b", "Wrong")],
        "a",
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

fn service(repo: &InMemoryRepository) -> ProgressService {
    ProgressService::new(stepping_test_clock(), Arc::new(repo.clone()))
        .with_retry(RetryPolicy::no_retry())
}

#[tokio::test]
async fn learner_walks_the_catalog_with_gating() {
    let repo = InMemoryRepository::new();
    let (mut engine, task) = service(&repo).open(catalog()).await.unwrap();

    assert!(engine.select_first_question_set());
    assert!(engine.record_answer(&"q1".into(), &"a".into()));
    assert!(!engine.record_answer(&"q2".into(), &"b".into()));

    // q2 is wrong, so the set starts over
    assert_eq!(engine.advance_to_next_question_set(), AdvanceOutcome::Reset);
    assert!(engine.answers().is_empty());
    assert_eq!(engine.cursor().question_index(), 0);

    engine.record_answer(&"q1".into(), &"a".into());
    engine.move_to_next_question();
    engine.record_answer(&"q2".into(), &"a".into());
    assert_eq!(
        engine.advance_to_next_question_set(),
        AdvanceOutcome::Moved {
            chapter_id: "c1".into(),
            question_set_id: "s2".into(),
        }
    );

    engine.record_answer(&"q3".into(), &"a".into());
    let outcome = engine.advance_to_next_question_set();
    assert_eq!(
        outcome,
        AdvanceOutcome::Moved {
            chapter_id: "c2".into(),
            question_set_id: "s3".into(),
        }
    );

    engine.record_answer(&"q4".into(), &"a".into());
    assert_eq!(engine.advance_to_next_question_set(), AdvanceOutcome::Exhausted);

    let expected = engine.snapshot();
    drop(engine);
    task.flushed().await;

    let restored = repo.load_state().await.unwrap();
    assert_eq!(restored.answers.as_ref(), Some(&expected.answers));
    assert_eq!(restored.progress.as_ref(), Some(&expected.progress));

    let progress = restored.progress.unwrap();
    let s1 = progress.set(&"c1".into(), &"s1".into()).unwrap();
    assert_eq!((s1.completed_questions(), s1.correct_answers()), (2, 2));
    let c1 = progress.chapter(&"c1".into()).unwrap();
    assert!((c1.total_correct_rate() - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn reopening_restores_answers_and_progress() {
    let repo = InMemoryRepository::new();
    {
        let (mut engine, task) = service(&repo).open(catalog()).await.unwrap();
        engine.set_current_chapter("c1");
        engine.set_current_question_set("s2");
        engine.record_answer(&"q3".into(), &"b".into());
        drop(engine);
        task.flushed().await;
    }

    let (engine, task) = service(&repo).open(catalog()).await.unwrap();
    assert_eq!(engine.answers().len(), 1);
    assert!(!engine.latest_answer(&"q3".into()).unwrap().is_correct);
    let s2 = engine.set_progress(&"c1".into(), &"s2".into()).unwrap();
    assert_eq!((s2.completed_questions(), s2.correct_answers()), (1, 0));
    assert!(engine.current_question().is_none());
    drop(engine);
    task.flushed().await;
}

#[tokio::test]
async fn first_open_persists_fresh_progress() {
    let repo = InMemoryRepository::new();
    let service = service(&repo);
    let (engine, task) = service.open(catalog()).await.unwrap();
    drop(engine);
    task.flushed().await;

    let progress = service.load_progress().await.unwrap();
    assert_eq!(progress.chapters().len(), 2);
    let s3 = progress.set(&"c2".into(), &"s3".into()).unwrap();
    assert_eq!(s3.total_questions(), 1);
    assert_eq!(s3.completed_questions(), 0);
}

#[tokio::test]
async fn advancing_an_unanswered_set_resets_in_place() {
    let repo = InMemoryRepository::new();
    let (mut engine, task) = service(&repo).open(catalog()).await.unwrap();
    engine.set_current_chapter("c1");
    engine.set_current_question_set("s2");

    assert_eq!(engine.advance_to_next_question_set(), AdvanceOutcome::Reset);
    let (chapter, set) = engine.cursor().selection().unwrap();
    assert_eq!((chapter.as_str(), set.as_str()), ("c1", "s2"));
    assert_eq!(engine.cursor().question_index(), 0);

    drop(engine);
    task.flushed().await;

    let progress = repo.load_state().await.unwrap().progress.unwrap();
    let s2 = progress.set(&"c1".into(), &"s2".into()).unwrap();
    assert_eq!((s2.completed_questions(), s2.correct_answers()), (0, 0));
    assert_eq!(s2.total_questions(), 1);
}

#[tokio::test]
async fn advancing_creates_the_missing_target_entry() {
    let repo = InMemoryRepository::new();
    repo.save_state(&StateSnapshot {
        answers: AnswerLog::new(),
        progress: ProgressMap::new(),
    })
    .await
    .unwrap();

    let (mut engine, task) = service(&repo).open(catalog()).await.unwrap();
    assert!(engine.progress().is_empty());
    engine.set_current_chapter("c1");
    engine.set_current_question_set("s2");
    assert!(engine.record_answer(&"q3".into(), &"a".into()));
    assert!(engine.set_progress(&"c2".into(), &"s3".into()).is_none());

    assert_eq!(
        engine.advance_to_next_question_set(),
        AdvanceOutcome::Moved {
            chapter_id: "c2".into(),
            question_set_id: "s3".into(),
        }
    );
    assert_eq!(engine.cursor().question_index(), 0);
    drop(engine);
    task.flushed().await;

    let progress = repo.load_state().await.unwrap().progress.unwrap();
    let s3 = progress.set(&"c2".into(), &"s3".into()).unwrap();
    assert_eq!(s3.total_questions(), 1);
    assert_eq!((s3.completed_questions(), s3.correct_answers()), (0, 0));
}
