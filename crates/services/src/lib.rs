#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod question_store;
pub mod sessions;
pub mod source;
pub mod textbook;

pub use app_services::{AppServices, ContentLocation};
pub use error::{AppServicesError, QuestionLoadError, SessionError, SourceError, TextbookError};
pub use question_store::QuestionStore;
pub use sessions::{
    AnswerOutcome, CategoryFilter, Direction, ProgressOverview, QuestionListEntry, QuizMode,
    QuizService, QuizSession,
};
pub use source::{ContentSource, FsSource, HttpSource, InMemorySource};
pub use textbook::{RenderedNote, TextbookIndex, TextbookService};
