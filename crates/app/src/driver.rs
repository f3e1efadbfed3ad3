use std::fmt::Write as _;

use quiz_core::model::ProgressMap;
use services::{AdvanceOutcome, ProgressEngine};

/// One line of learner input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// 1-based option number.
    Choose(usize),
    Next,
    Previous,
    Advance,
    Reset,
    Status,
    Quit,
    Unknown(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line {
            "n" => Self::Next,
            "p" => Self::Previous,
            "a" => Self::Advance,
            "r" => Self::Reset,
            "s" => Self::Status,
            "q" | "quit" => Self::Quit,
            _ => match line.parse::<usize>() {
                Ok(n) if n > 0 => Self::Choose(n),
                _ => Self::Unknown(line.to_string()),
            },
        }
    }
}

pub enum Step {
    Continue(String),
    Quit,
}

pub const HELP: &str = "commands: <number> answer, n next, p previous, a advance, r reset, s status, q quit";

/// The question under the cursor with numbered options.
pub fn render_question(engine: &ProgressEngine) -> String {
    let (Some(chapter), Some(set)) = (engine.current_chapter(), engine.current_question_set())
    else {
        return "no question set selected".to_string();
    };
    let Some(question) = engine.current_question() else {
        return format!("{} / {}: no questions", chapter.title(), set.title());
    };

    let mut out = format!(
        "[{} / {} ({})] question {} of {}\n{}\n",
        chapter.title(),
        set.title(),
        set.kind().as_str(),
        engine.cursor().question_index() + 1,
        set.question_count(),
        question.prompt(),
    );
    let previous = engine.latest_answer(question.id());
    for (i, option) in question.options().iter().enumerate() {
        let marker = if previous.is_some_and(|r| &r.selected_option_id == option.id()) {
            '*'
        } else {
            ' '
        };
        let _ = writeln!(out, " {marker}{}. {}", i + 1, option.text());
    }
    out
}

/// Applies one input to the engine and describes what happened.
pub fn handle(engine: &mut ProgressEngine, input: Input) -> Step {
    let message = match input {
        Input::Quit => return Step::Quit,
        Input::Choose(n) => choose(engine, n),
        Input::Next => {
            if engine.move_to_next_question() {
                render_question(engine)
            } else {
                "already at the last question".to_string()
            }
        }
        Input::Previous => {
            if engine.move_to_previous_question() {
                render_question(engine)
            } else {
                "already at the first question".to_string()
            }
        }
        Input::Advance => match engine.advance_to_next_question_set() {
            AdvanceOutcome::Moved { .. } => {
                format!("well done, moving on\n{}", render_question(engine))
            }
            AdvanceOutcome::Reset => format!(
                "not every answer is correct yet; the set starts over\n{}",
                render_question(engine)
            ),
            AdvanceOutcome::Exhausted => "every question set is mastered".to_string(),
        },
        Input::Reset => {
            engine.reset_current_set();
            render_question(engine)
        }
        Input::Status => status_line(engine),
        Input::Unknown(raw) => format!("unknown input {raw:?}; {HELP}"),
    };
    Step::Continue(message)
}

fn choose(engine: &mut ProgressEngine, n: usize) -> String {
    let Some(question) = engine.current_question() else {
        return "no question to answer".to_string();
    };
    let Some(option) = question.options().get(n - 1) else {
        return format!("choose an option between 1 and {}", question.options().len());
    };
    let question_id = question.id().clone();
    let option_id = option.id().clone();
    let explanation = question.explanation().map(str::to_string);

    let mut out = if engine.record_answer(&question_id, &option_id) {
        "correct".to_string()
    } else {
        "incorrect".to_string()
    };
    if let Some(explanation) = explanation {
        let _ = write!(out, ": {explanation}");
    }
    let _ = write!(
        out,
        " (accuracy {:.0}%)",
        engine.question_accuracy(&question_id)
    );
    if engine.move_to_next_question() {
        out.push('\n');
        out.push_str(&render_question(engine));
    } else if engine.is_current_set_all_correct() {
        out.push_str("\nset mastered; type a to advance");
    }
    out
}

fn status_line(engine: &ProgressEngine) -> String {
    let Some(status) = engine.current_set_status() else {
        return "no question set selected".to_string();
    };
    format!(
        "{} of {} answered, {} correct, {} remaining",
        status.answered,
        status.total,
        status.correct,
        status.remaining()
    )
}

/// Human-readable summary of persisted progress.
pub fn render_progress(progress: &ProgressMap) -> String {
    if progress.is_empty() {
        return "no progress recorded".to_string();
    }
    let mut out = String::new();
    for (chapter_id, chapter) in progress.chapters() {
        let _ = writeln!(
            out,
            "{chapter_id}: {:.0}% correct",
            chapter.total_correct_rate() * 100.0
        );
        for (set_id, set) in chapter.question_sets() {
            let last = set
                .last_attempt_at()
                .map_or_else(|| "never".to_string(), |at| at.to_rfc3339());
            let _ = writeln!(
                out,
                "  {set_id}: {}/{} correct over {} questions, last attempt {last}",
                set.correct_answers(),
                set.completed_questions(),
                set.total_questions()
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerOption, Catalog, Chapter, Question, QuestionSet, QuestionSetKind};
    use services::StateSink;
    use std::sync::Arc;
    use storage::repository::{RestoredState, StateSnapshot};

    struct NullSink;

    impl StateSink for NullSink {
        fn save_state(&self, _snapshot: StateSnapshot) {}
    }

    fn engine() -> ProgressEngine {
        let question = |id: &str| {
            Question::new(
                id,
                format!("Prompt {id}"),
                vec![AnswerOption::new("a", "Yes"), AnswerOption::new("b", "No")],
                "a",
            )
            .with_explanation("because")
        };
        let catalog = Catalog::new(vec![Chapter::new(
            "c1",
            "Intro",
            vec![QuestionSet::new(
                "s1",
                "Basics",
                QuestionSetKind::Practice,
                vec![question("q1"), question("q2")],
            )],
        )])
        .unwrap();
        let mut engine =
            ProgressEngine::initialize(catalog, RestoredState::empty(), Arc::new(NullSink));
        engine.select_first_question_set();
        engine
    }

    fn message(step: Step) -> String {
        match step {
            Step::Continue(message) => message,
            Step::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn parses_commands_and_option_numbers() {
        assert_eq!(Input::parse(" 2 \n"), Input::Choose(2));
        assert_eq!(Input::parse("a"), Input::Advance);
        assert_eq!(Input::parse("q"), Input::Quit);
        assert_eq!(Input::parse("0"), Input::Unknown("0".into()));
        assert_eq!(Input::parse("zz"), Input::Unknown("zz".into()));
    }

    #[test]
    fn renders_numbered_options() {
        let text = render_question(&engine());
        assert!(text.contains("question 1 of 2"));
        assert!(text.contains(" 1. Yes"));
        assert!(text.contains(" 2. No"));
    }

    #[test]
    fn answering_moves_on_and_marks_choice() {
        let mut engine = engine();
        let out = message(handle(&mut engine, Input::Choose(1)));
        assert!(out.starts_with("correct: because"));
        assert!(out.contains("question 2 of 2"));

        handle(&mut engine, Input::Previous);
        assert!(render_question(&engine).contains("*1. Yes"));
    }

    #[test]
    fn out_of_range_option_is_rejected() {
        let mut engine = engine();
        let out = message(handle(&mut engine, Input::Choose(3)));
        assert!(out.contains("between 1 and 2"));
        assert!(engine.answers().is_empty());
    }

    #[test]
    fn advance_reports_reset_and_exhaustion() {
        let mut engine = engine();
        let out = message(handle(&mut engine, Input::Advance));
        assert!(out.contains("starts over"));

        handle(&mut engine, Input::Choose(1));
        let out = message(handle(&mut engine, Input::Choose(1)));
        assert!(out.contains("set mastered"));
        let out = message(handle(&mut engine, Input::Advance));
        assert_eq!(out, "every question set is mastered");
    }

    #[test]
    fn progress_summary_lists_sets() {
        let mut engine = engine();
        handle(&mut engine, Input::Choose(2));
        let text = render_progress(engine.progress());
        assert!(text.contains("c1: 0% correct"));
        assert!(text.contains("s1: 0/1 correct over 2 questions"));
        assert_eq!(render_progress(&ProgressMap::new()), "no progress recorded");
    }
}
