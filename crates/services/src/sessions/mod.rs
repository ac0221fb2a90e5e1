mod filter;
mod progress;
mod session;
mod shuffle;
mod workflow;

// Public API of the quiz session subsystem.
pub use crate::error::SessionError;
pub use filter::{CategoryFilter, ParseFilterError, QuizMode, select_questions};
pub use progress::ProgressOverview;
pub use session::{Direction, QuestionListEntry, QuizSession};
pub use shuffle::fisher_yates;
pub use workflow::{AnswerOutcome, QuizService};
