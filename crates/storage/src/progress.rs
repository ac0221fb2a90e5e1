//! Progress Store: durable per-question records for one exam module.
//!
//! Persisted shape is `{ "<question id>": { "status": ..., "flagged": ... } }`.
//! Older data stored a bare status string per question; it is accepted on
//! read, normalized, and written back once in the new shape.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use quiz_core::model::{AnswerStatus, ExamModule, ProgressMap, ProgressRecord, QuestionId};

use crate::repository::{KeyValueRepository, StorageError};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("progress for {module} could not be encoded: {reason}")]
    Encode { module: String, reason: String },
}

//
// ─── DECODE ───────────────────────────────────────────────────────────────────
//

/// Result of decoding a persisted progress blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedProgress {
    pub progress: ProgressMap,
    /// Entries that were read from the legacy bare-string shape.
    pub legacy_entries: usize,
    /// Record-shaped entries whose fields had to be coerced, e.g. a
    /// non-boolean `flagged` or an empty status.
    pub normalized_entries: usize,
    /// Entries with a shape that is neither current nor legacy.
    pub dropped_entries: usize,
}

impl DecodedProgress {
    /// Whether the stored blob differs from `progress` and must be rewritten.
    #[must_use]
    pub fn needs_rewrite(&self) -> bool {
        self.legacy_entries + self.normalized_entries + self.dropped_entries > 0
    }
}

/// Decode a persisted progress blob, accepting both the current record shape
/// and the legacy `id -> "status"` shape.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the blob is not a JSON object.
pub fn decode_progress(raw: &str) -> Result<DecodedProgress, StorageError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))?;
    let Value::Object(entries) = value else {
        return Err(StorageError::Serialization(
            "progress blob is not an object".into(),
        ));
    };

    let mut decoded = DecodedProgress::default();
    for (id, entry) in entries {
        let id = QuestionId::new(id);
        match entry {
            Value::String(status) => {
                decoded
                    .progress
                    .insert(id, ProgressRecord::new(status_from_text(status), false));
                decoded.legacy_entries += 1;
            }
            Value::Object(fields) if fields.contains_key("status") || fields.contains_key("flagged") => {
                let (status, status_exact) = match fields.get("status") {
                    Some(Value::Null) => (None, true),
                    Some(Value::String(text)) => {
                        let status = status_from_text(text.clone());
                        let exact = status.is_some();
                        (status, exact)
                    }
                    _ => (None, false),
                };
                let (flagged, flagged_exact) = match fields.get("flagged") {
                    Some(Value::Bool(flag)) => (*flag, true),
                    _ => (false, false),
                };
                if !(status_exact && flagged_exact) || fields.len() > 2 {
                    decoded.normalized_entries += 1;
                }
                decoded.progress.insert(id, ProgressRecord::new(status, flagged));
            }
            _ => decoded.dropped_entries += 1,
        }
    }
    Ok(decoded)
}

/// Empty status text means "not answered".
fn status_from_text(text: String) -> Option<AnswerStatus> {
    if text.is_empty() { None } else { Some(AnswerStatus::from(text)) }
}

fn encode_progress(module: &ExamModule, progress: &ProgressMap) -> Result<String, ProgressError> {
    serde_json::to_string(progress).map_err(|e| ProgressError::Encode {
        module: module.key().to_string(),
        reason: e.to_string(),
    })
}

//
// ─── STORE ────────────────────────────────────────────────────────────────────
//

/// A value produced by a mutation together with the outcome of persisting it.
///
/// A failed save never rolls the in-memory mutation back; the caller keeps
/// working with `value` and may surface `save_error`.
#[derive(Debug)]
pub struct Persisted<T> {
    pub value: T,
    pub save_error: Option<ProgressError>,
}

impl<T> Persisted<T> {
    #[must_use]
    pub fn is_saved(&self) -> bool {
        self.save_error.is_none()
    }
}

/// Sole writer of persisted progress.
#[derive(Clone)]
pub struct ProgressStore {
    repo: Arc<dyn KeyValueRepository>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(repo: Arc<dyn KeyValueRepository>) -> Self {
        Self { repo }
    }

    /// Load the progress mapping for `module`, migrating legacy entries.
    ///
    /// A blob that cannot be decoded is logged and treated as empty. When
    /// legacy, repaired or dropped entries are found the normalized mapping is
    /// written back before returning; a failed write-back is logged and does
    /// not fail the load.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the backend cannot be read.
    pub async fn load(&self, module: &ExamModule) -> Result<ProgressMap, ProgressError> {
        let key = module.progress_key();
        let Some(raw) = self.repo.get(&key).await? else {
            debug!(module = %module, "no stored progress");
            return Ok(ProgressMap::new());
        };

        let decoded = match decode_progress(&raw) {
            Ok(decoded) => decoded,
            Err(error) => {
                warn!(module = %module, %error, "stored progress is unreadable; starting empty");
                return Ok(ProgressMap::new());
            }
        };

        if decoded.dropped_entries + decoded.normalized_entries > 0 {
            warn!(
                module = %module,
                dropped = decoded.dropped_entries,
                normalized = decoded.normalized_entries,
                "repaired progress entries with an unexpected shape"
            );
        }

        if decoded.needs_rewrite() {
            info!(
                module = %module,
                migrated = decoded.legacy_entries,
                "rewriting progress data in record format"
            );
            if let Err(error) = self.save(module, &decoded.progress).await {
                warn!(module = %module, %error, "failed to persist migrated progress");
            }
        }

        Ok(decoded.progress)
    }

    /// Serialize and write the whole mapping for `module`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if encoding or the backend write fails.
    pub async fn save(&self, module: &ExamModule, progress: &ProgressMap) -> Result<(), ProgressError> {
        let encoded = encode_progress(module, progress)?;
        self.repo.put(&module.progress_key(), &encoded).await?;
        Ok(())
    }

    /// Record an answer outcome and persist. The flag is left untouched.
    pub async fn record_answer(
        &self,
        module: &ExamModule,
        progress: &mut ProgressMap,
        id: &QuestionId,
        status: AnswerStatus,
    ) -> Persisted<ProgressRecord> {
        let value = progress.record_answer(id.clone(), status);
        let save_error = self.save_logged(module, progress).await;
        Persisted { value, save_error }
    }

    /// Flip the flag for `id`, persist, and return the new flag value.
    pub async fn toggle_flag(
        &self,
        module: &ExamModule,
        progress: &mut ProgressMap,
        id: &QuestionId,
    ) -> Persisted<bool> {
        let value = progress.toggle_flag(id.clone());
        let save_error = self.save_logged(module, progress).await;
        Persisted { value, save_error }
    }

    async fn save_logged(&self, module: &ExamModule, progress: &ProgressMap) -> Option<ProgressError> {
        match self.save(module, progress).await {
            Ok(()) => None,
            Err(error) => {
                warn!(module = %module, %error, "failed to save progress; keeping in-memory state");
                Some(error)
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use async_trait::async_trait;

    struct ReadOnlyRepository {
        inner: InMemoryRepository,
    }

    #[async_trait]
    impl KeyValueRepository for ReadOnlyRepository {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key).await
        }

        async fn put(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("database is read-only".into()))
        }
    }

    fn store_with(raw: &str) -> (InMemoryRepository, ProgressStore) {
        let repo = InMemoryRepository::with_entries([(ExamModule::msra().progress_key(), raw)]);
        let store = ProgressStore::new(Arc::new(repo.clone()));
        (repo, store)
    }

    #[test]
    fn decode_accepts_both_shapes_and_drops_others() {
        let decoded = decode_progress(
            r#"{"a":"correct","b":{"status":"incorrect","flagged":true},"c":{"flagged":true},"d":42,"e":{"other":1}}"#,
        )
        .unwrap();
        assert_eq!(decoded.legacy_entries, 1);
        assert_eq!(decoded.normalized_entries, 1);
        assert_eq!(decoded.dropped_entries, 2);
        assert!(decoded.needs_rewrite());
        let p = &decoded.progress;
        assert_eq!(p.get(&QuestionId::new("a")), Some(&ProgressRecord::new(Some(AnswerStatus::Correct), false)));
        assert_eq!(p.get(&QuestionId::new("b")), Some(&ProgressRecord::new(Some(AnswerStatus::Incorrect), true)));
        assert_eq!(p.get(&QuestionId::new("c")), Some(&ProgressRecord::new(None, true)));
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn decode_keeps_unknown_status_text() {
        let decoded =
            decode_progress(r#"{"a":"skipped","b":{"status":"skipped","flagged":true}}"#).unwrap();
        let skipped = Some(AnswerStatus::Other("skipped".into()));
        assert_eq!(decoded.progress.status(&QuestionId::new("a")), skipped);
        assert_eq!(decoded.progress.status(&QuestionId::new("b")), skipped);
        assert_eq!(decoded.legacy_entries, 1);
        assert_eq!(decoded.normalized_entries, 0);
    }

    #[test]
    fn decode_treats_empty_status_as_unanswered() {
        let decoded = decode_progress(r#"{"a":"","b":{"status":"","flagged":true}}"#).unwrap();
        assert_eq!(decoded.progress.status(&QuestionId::new("a")), None);
        assert_eq!(decoded.progress.get(&QuestionId::new("b")), Some(&ProgressRecord::new(None, true)));
        assert_eq!(decoded.normalized_entries, 1);
        assert!(decoded.needs_rewrite());
    }

    #[test]
    fn decode_rejects_non_object() {
        assert!(decode_progress("[1,2]").is_err());
        assert!(decode_progress("not json").is_err());
    }

    #[tokio::test]
    async fn legacy_progress_is_migrated_and_rewritten() {
        let module = ExamModule::msra();
        let (repo, store) = store_with(r#"{"q1":"correct"}"#);

        let first = store.load(&module).await.unwrap();
        assert_eq!(
            first.get(&QuestionId::new("q1")),
            Some(&ProgressRecord::new(Some(AnswerStatus::Correct), false))
        );

        let raw = repo.get(&module.progress_key()).await.unwrap().unwrap();
        assert_eq!(raw, r#"{"q1":{"status":"correct","flagged":false}}"#);

        let second = store.load(&module).await.unwrap();
        assert_eq!(first, second);
        let raw_again = repo.get(&module.progress_key()).await.unwrap().unwrap();
        assert_eq!(raw, raw_again);
    }

    #[tokio::test]
    async fn unknown_record_status_matches_what_is_stored() {
        let module = ExamModule::msra();
        let stored = r#"{"q1":{"status":"skipped","flagged":false}}"#;
        let (repo, store) = store_with(stored);

        let progress = store.load(&module).await.unwrap();
        let raw = repo.get(&module.progress_key()).await.unwrap().unwrap();
        assert_eq!(raw, stored);
        assert_eq!(serde_json::to_string(&progress).unwrap(), raw);
    }

    #[tokio::test]
    async fn unknown_legacy_status_is_kept_on_migration() {
        let module = ExamModule::msra();
        let (repo, store) = store_with(r#"{"q1":"skipped"}"#);

        let progress = store.load(&module).await.unwrap();
        assert_eq!(
            progress.status(&QuestionId::new("q1")),
            Some(AnswerStatus::Other("skipped".into()))
        );
        let raw = repo.get(&module.progress_key()).await.unwrap().unwrap();
        assert_eq!(raw, r#"{"q1":{"status":"skipped","flagged":false}}"#);
    }

    #[tokio::test]
    async fn shape_repairs_are_written_back() {
        let module = ExamModule::msra();
        let (repo, store) = store_with(r#"{"q1":{"status":"correct","flagged":"yes"},"q2":7}"#);

        let progress = store.load(&module).await.unwrap();
        let raw = repo.get(&module.progress_key()).await.unwrap().unwrap();
        assert_eq!(raw, r#"{"q1":{"status":"correct","flagged":false}}"#);
        assert_eq!(serde_json::to_string(&progress).unwrap(), raw);
    }

    #[tokio::test]
    async fn unreadable_blob_loads_empty() {
        let (_repo, store) = store_with("{broken");
        let progress = store.load(&ExamModule::msra()).await.unwrap();
        assert!(progress.is_empty());
    }

    #[tokio::test]
    async fn missing_blob_loads_empty() {
        let store = ProgressStore::new(Arc::new(InMemoryRepository::new()));
        assert!(store.load(&ExamModule::pd()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_migration_write_still_returns_migrated_map() {
        let module = ExamModule::msra();
        let inner = InMemoryRepository::with_entries([(module.progress_key(), r#"{"q1":"incorrect"}"#)]);
        let store = ProgressStore::new(Arc::new(ReadOnlyRepository { inner }));
        let progress = store.load(&module).await.unwrap();
        assert_eq!(progress.status(&QuestionId::new("q1")), Some(AnswerStatus::Incorrect));
    }

    #[tokio::test]
    async fn toggle_flag_persists_and_keeps_status() {
        let module = ExamModule::msra();
        let (repo, store) = store_with(r#"{"q1":{"status":"correct","flagged":false}}"#);
        let mut progress = store.load(&module).await.unwrap();
        let id = QuestionId::new("q1");

        let toggled = store.toggle_flag(&module, &mut progress, &id).await;
        assert!(toggled.is_saved());
        assert!(toggled.value);

        let reloaded = ProgressStore::new(Arc::new(repo)).load(&module).await.unwrap();
        assert_eq!(reloaded.get(&id), Some(&ProgressRecord::new(Some(AnswerStatus::Correct), true)));
    }

    #[tokio::test]
    async fn save_failure_keeps_memory_ahead_of_disk() {
        let module = ExamModule::pd();
        let inner = InMemoryRepository::new();
        let store = ProgressStore::new(Arc::new(ReadOnlyRepository { inner: inner.clone() }));
        let mut progress = ProgressMap::new();
        let id = QuestionId::new("7");

        let outcome = store
            .record_answer(&module, &mut progress, &id, AnswerStatus::Correct)
            .await;
        assert!(!outcome.is_saved());
        assert_eq!(outcome.value.status, Some(AnswerStatus::Correct));
        assert_eq!(progress.status(&id), Some(AnswerStatus::Correct));
        assert_eq!(inner.get(&module.progress_key()).await.unwrap(), None);
    }
}
