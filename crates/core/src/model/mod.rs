mod answer;
mod catalog;
mod cursor;
mod ids;
mod progress;

pub use ids::{ChapterId, OptionId, ParseIdError, QuestionId, QuestionSetId};

pub use answer::{AnswerLog, AnswerRecord};
pub use catalog::{
    AnswerOption, Article, Catalog, CatalogError, Chapter, Question, QuestionSet, QuestionSetKind,
};
pub use cursor::{CursorState, NavigationCursor};
pub use progress::{ChapterProgress, ProgressMap, SetProgress, question_total};
