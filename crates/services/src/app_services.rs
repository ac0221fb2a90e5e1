use std::sync::Arc;

use storage::{ProgressStore, Storage};

use crate::error::AppServicesError;
use crate::question_store::QuestionStore;
use crate::sessions::QuizService;
use crate::source::{ContentSource, FsSource, HttpSource};
use crate::textbook::TextbookService;

/// Where question batches and textbook files are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentLocation {
    Directory(String),
    Http(String),
}

impl ContentLocation {
    /// `http://` and `https://` values are treated as a base URL, anything
    /// else as a local directory.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Http(raw.to_string())
        } else {
            Self::Directory(raw.to_string())
        }
    }

    fn open(&self) -> Result<Arc<dyn ContentSource>, AppServicesError> {
        let source: Arc<dyn ContentSource> = match self {
            Self::Directory(root) => Arc::new(FsSource::new(root)),
            Self::Http(base) => Arc::new(HttpSource::new(base)?),
        };
        Ok(source)
    }
}

/// Assembles app-facing services over one storage backend and one content
/// source.
#[derive(Clone)]
pub struct AppServices {
    quiz: Arc<QuizService>,
    textbook: Arc<TextbookService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// content location is not usable.
    pub async fn new_sqlite(
        db_url: &str,
        content: &ContentLocation,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_parts(&storage, content.open()?))
    }

    /// Build services that keep progress in memory only.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the content location is not usable.
    pub fn new_in_memory(content: &ContentLocation) -> Result<Self, AppServicesError> {
        Ok(Self::from_parts(&Storage::in_memory(), content.open()?))
    }

    /// Wire services over an existing storage aggregate and content source.
    #[must_use]
    pub fn from_parts(storage: &Storage, source: Arc<dyn ContentSource>) -> Self {
        let questions = Arc::new(QuestionStore::new(Arc::clone(&source)));
        let progress = ProgressStore::new(Arc::clone(&storage.progress));
        let quiz = Arc::new(QuizService::new(questions, progress));
        let textbook = Arc::new(TextbookService::new(source));
        Self { quiz, textbook }
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizService> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn textbook(&self) -> Arc<TextbookService> {
        Arc::clone(&self.textbook)
    }
}
