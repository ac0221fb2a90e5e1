#![forbid(unsafe_code)]

pub mod progress;
pub mod repository;
pub mod sqlite;

pub use progress::{DecodedProgress, Persisted, ProgressError, ProgressStore, decode_progress};
pub use repository::{InMemoryRepository, KeyValueRepository, Storage, StorageError};
