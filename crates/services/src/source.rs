//! Where static quiz content comes from: batch files, textbook index, notes.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use crate::error::SourceError;

/// Read-only access to static content by relative path.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch the text stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the content is missing or cannot be read.
    async fn fetch_text(&self, path: &str) -> Result<String, SourceError>;
}

//
// ─── FILESYSTEM ───────────────────────────────────────────────────────────────
//

/// Content rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, SourceError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(SourceError::InvalidPath {
                path: path.to_string(),
                reason: "must be relative to the content root".into(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ContentSource for FsSource {
    async fn fetch_text(&self, path: &str) -> Result<String, SourceError> {
        let full = self.resolve(path)?;
        tokio::fs::read_to_string(&full).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                SourceError::NotFound(path.to_string())
            } else {
                SourceError::Io(err.to_string())
            }
        })
    }
}

//
// ─── HTTP ─────────────────────────────────────────────────────────────────────
//

/// Content served over HTTP(S) below a base URL.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base: Url,
}

impl HttpSource {
    /// Build a source for `base`. A trailing slash is added if missing so
    /// relative paths resolve below it.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::InvalidPath` if `base` is not a valid URL.
    pub fn new(base: &str) -> Result<Self, SourceError> {
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        let base = Url::parse(&normalized).map_err(|err| SourceError::InvalidPath {
            path: base.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            base,
        })
    }

    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url_for(&self, path: &str) -> Result<Url, SourceError> {
        self.base.join(path).map_err(|err| SourceError::InvalidPath {
            path: path.to_string(),
            reason: err.to_string(),
        })
    }
}

#[async_trait]
impl ContentSource for HttpSource {
    async fn fetch_text(&self, path: &str) -> Result<String, SourceError> {
        let url = self.url_for(path)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::HttpStatus(status));
        }
        Ok(response.text().await?)
    }
}

//
// ─── IN MEMORY ────────────────────────────────────────────────────────────────
//

/// In-memory content for tests and prototyping. Counts fetches.
#[derive(Clone, Default)]
pub struct InMemorySource {
    files: Arc<Mutex<HashMap<String, String>>>,
    fetches: Arc<AtomicUsize>,
}

impl InMemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<String>, body: impl Into<String>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), body.into());
        }
    }

    pub fn remove(&self, path: &str) {
        if let Ok(mut files) = self.files.lock() {
            files.remove(path);
        }
    }

    /// Number of `fetch_text` calls so far, successful or not.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for InMemorySource {
    async fn fetch_text(&self, path: &str) -> Result<String, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let files = self
            .files
            .lock()
            .map_err(|err| SourceError::Io(err.to_string()))?;
        files
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(path.to_string()))
    }
}
