mod exam_module;
mod ids;
mod progress;
mod question;

pub use exam_module::{ExamModule, ExamModuleError};
pub use ids::{CategoryId, NoteId, ParseIdError, QuestionId};
pub use progress::{AnswerStatus, CategoryProgress, ProgressMap, ProgressRecord, ProgressTally};
pub use question::{OptionSlot, Question, QuestionKind, QuestionKindError, option_letter};
