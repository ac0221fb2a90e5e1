use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use quiz_core::model::{ExamModule, Question};

use crate::error::QuestionLoadError;
use crate::source::ContentSource;

/// Loads and caches every question of an exam module.
///
/// Questions are fetched once per module as fixed-size batch files and kept
/// in memory, shared as `Arc<[Question]>` with every session built from them.
pub struct QuestionStore {
    source: Arc<dyn ContentSource>,
    loaded: Mutex<HashMap<String, Arc<[Question]>>>,
}

impl QuestionStore {
    #[must_use]
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self {
            source,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Questions currently held for `module`, complete or not.
    #[must_use]
    pub fn cached(&self, module: &ExamModule) -> Option<Arc<[Question]>> {
        self.loaded
            .lock()
            .ok()
            .and_then(|loaded| loaded.get(module.key()).cloned())
    }

    /// Whether every question of `module` is already in memory.
    #[must_use]
    pub fn is_complete(&self, module: &ExamModule) -> bool {
        self.cached(module)
            .is_some_and(|questions| questions.len() == module.total_questions())
    }

    /// Load all questions for `module`.
    ///
    /// Returns the cached set without fetching when it is complete. Otherwise
    /// every batch is requested at once and the results are concatenated in
    /// batch order. Any failing batch aborts the load and nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns `QuestionLoadError` naming the first failing batch path.
    pub async fn load_all(&self, module: &ExamModule) -> Result<Arc<[Question]>, QuestionLoadError> {
        if let Some(questions) = self
            .cached(module)
            .filter(|questions| questions.len() == module.total_questions())
        {
            debug!(module = %module, "questions already in memory");
            return Ok(questions);
        }

        info!(
            module = %module,
            batches = module.batch_count(),
            "loading all questions"
        );

        let fetches = module
            .batch_ranges()
            .into_iter()
            .map(|(start, end)| self.load_batch(module.batch_path(start, end)));

        let batches = match try_join_all(fetches).await {
            Ok(batches) => batches,
            Err(error) => {
                warn!(module = %module, path = error.path(), %error, "question load failed");
                return Err(error);
            }
        };

        let questions: Arc<[Question]> = batches.into_iter().flatten().collect();
        info!(module = %module, count = questions.len(), "questions loaded");

        if let Ok(mut loaded) = self.loaded.lock() {
            loaded.insert(module.key().to_string(), Arc::clone(&questions));
        }
        Ok(questions)
    }

    async fn load_batch(&self, path: String) -> Result<Vec<Question>, QuestionLoadError> {
        let body = match self.source.fetch_text(&path).await {
            Ok(body) => body,
            Err(source) => return Err(QuestionLoadError::Fetch { path, source }),
        };

        let value: Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(err) => {
                return Err(QuestionLoadError::Malformed {
                    path,
                    reason: err.to_string(),
                });
            }
        };

        if !value.is_array() {
            warn!(path = %path, "question batch is not an array; skipping");
            return Ok(Vec::new());
        }

        serde_json::from_value(value).map_err(|err| QuestionLoadError::Malformed {
            path,
            reason: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;
    use quiz_core::model::CategoryId;

    fn module(total: usize) -> ExamModule {
        let categories: [(CategoryId, String); 0] = [];
        ExamModule::new("t", total, 2, "t/q/", "t/idx.html", "t/notes/", categories).unwrap()
    }

    fn batch(ids: &[usize]) -> String {
        let items: Vec<String> = ids
            .iter()
            .map(|id| {
                format!(
                    r#"{{"question_id":"{id}","category":1,"question_type":"0","options":["","a","b"],"num_of_options":2,"correct_answer":"1"}}"#
                )
            })
            .collect();
        format!("[{}]", items.join(","))
    }

    fn seeded(total: usize) -> InMemorySource {
        let source = InMemorySource::new();
        let m = module(total);
        for (start, end) in m.batch_ranges() {
            let ids: Vec<usize> = (start..=end).collect();
            source.insert(m.batch_path(start, end), batch(&ids));
        }
        source
    }

    #[tokio::test]
    async fn loads_batches_in_order() {
        let source = seeded(5);
        let store = QuestionStore::new(Arc::new(source.clone()));
        let questions = store.load_all(&module(5)).await.unwrap();

        let ids: Vec<&str> = questions.iter().map(|q| q.id().as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
        assert_eq!(source.fetch_count(), 3);
        assert!(store.is_complete(&module(5)));
    }

    #[tokio::test]
    async fn complete_cache_is_not_refetched() {
        let source = seeded(4);
        let store = QuestionStore::new(Arc::new(source.clone()));
        let first = store.load_all(&module(4)).await.unwrap();
        let second = store.load_all(&module(4)).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn failing_batch_aborts_and_caches_nothing() {
        let source = seeded(6);
        let m = module(6);
        source.remove(&m.batch_path(2, 3));
        let store = QuestionStore::new(Arc::new(source));

        let err = store.load_all(&m).await.unwrap_err();
        assert_eq!(err.path(), "t/q/questions_2_to_3.json");
        assert!(matches!(err, QuestionLoadError::Fetch { .. }));
        assert!(store.cached(&m).is_none());
    }

    #[tokio::test]
    async fn malformed_batch_reports_path() {
        let source = seeded(2);
        let m = module(2);
        source.insert(m.batch_path(0, 1), "[{\"question_id\":1}]");
        let store = QuestionStore::new(Arc::new(source));

        let err = store.load_all(&m).await.unwrap_err();
        assert!(matches!(err, QuestionLoadError::Malformed { .. }));
        assert_eq!(err.path(), "t/q/questions_0_to_1.json");
    }

    #[tokio::test]
    async fn non_array_batch_leaves_cache_incomplete() {
        let source = seeded(4);
        let m = module(4);
        source.insert(m.batch_path(2, 3), "{}");
        let store = QuestionStore::new(Arc::new(source.clone()));

        let questions = store.load_all(&m).await.unwrap();
        assert_eq!(questions.len(), 2);
        assert!(!store.is_complete(&m));

        store.load_all(&m).await.unwrap();
        assert_eq!(source.fetch_count(), 4);
    }
}
