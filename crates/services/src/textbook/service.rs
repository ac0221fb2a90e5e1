use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use quiz_core::model::{ExamModule, NoteId};

use super::index::TextbookIndex;
use super::note::{RenderedNote, decode_note};
use crate::error::TextbookError;
use crate::source::ContentSource;

/// Loads textbook indexes and notes for exam modules.
pub struct TextbookService {
    source: Arc<dyn ContentSource>,
    indexes: Mutex<HashMap<String, Arc<TextbookIndex>>>,
}

impl TextbookService {
    #[must_use]
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self {
            source,
            indexes: Mutex::new(HashMap::new()),
        }
    }

    /// The module's textbook index, fetched on first use.
    ///
    /// # Errors
    ///
    /// Returns `TextbookError::Source` if the index page cannot be fetched.
    pub async fn index(&self, module: &ExamModule) -> Result<Arc<TextbookIndex>, TextbookError> {
        let cached = self
            .indexes
            .lock()
            .ok()
            .and_then(|indexes| indexes.get(module.key()).cloned());
        match cached {
            Some(index) => Ok(index),
            None => self.reload_index(module).await,
        }
    }

    /// Fetch and parse the index page again, replacing any cached copy.
    ///
    /// # Errors
    ///
    /// Returns `TextbookError::Source` if the index page cannot be fetched.
    pub async fn reload_index(
        &self,
        module: &ExamModule,
    ) -> Result<Arc<TextbookIndex>, TextbookError> {
        let path = module.textbook_index_path();
        let html = self.source.fetch_text(path).await.map_err(|source| {
            warn!(module = %module, path, error = %source, "textbook index load failed");
            TextbookError::Source {
                path: path.to_string(),
                source,
            }
        })?;

        let index = Arc::new(TextbookIndex::parse(&html));
        info!(module = %module, notes = index.len(), "textbook index loaded");
        if let Ok(mut indexes) = self.indexes.lock() {
            indexes.insert(module.key().to_string(), Arc::clone(&index));
        }
        Ok(index)
    }

    /// Resolve a question's linked note and load it.
    ///
    /// An id missing from the cached index triggers one index reload before
    /// giving up.
    ///
    /// # Errors
    ///
    /// Returns `TextbookError::UnknownNote` if the id is not in the index and
    /// `TextbookError::Source` if the index or note cannot be fetched.
    pub async fn resolve_note(
        &self,
        module: &ExamModule,
        note_id: &NoteId,
    ) -> Result<RenderedNote, TextbookError> {
        let mut index = self.index(module).await?;
        if !index.contains(note_id) {
            debug!(module = %module, note = %note_id, "note not in index; reloading");
            index = self.reload_index(module).await?;
        }
        let Some(filename) = index.filename(note_id) else {
            return Err(TextbookError::UnknownNote(note_id.clone()));
        };
        self.open_note_file(module, filename).await
    }

    /// Load a note by its filename under the module's textbook directory.
    ///
    /// # Errors
    ///
    /// Returns `TextbookError::Source` if the note cannot be fetched.
    pub async fn open_note_file(
        &self,
        module: &ExamModule,
        filename: &str,
    ) -> Result<RenderedNote, TextbookError> {
        let path = module.note_path(filename);
        let body = match self.source.fetch_text(&path).await {
            Ok(body) => body,
            Err(source) => return Err(TextbookError::Source { path, source }),
        };

        let note = decode_note(&body, filename);
        if !note.structured {
            debug!(path = %path, "note is not structured JSON; rendering as HTML");
        }
        Ok(note)
    }
}
