use async_trait::async_trait;
use learning_core::model::{CourseId, LectureId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Small durable key-value slot store (the desktop equivalent of browser local storage).
///
/// Writes are last-writer-wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read. A missing key is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Slot key holding the last lecture watched in a course.
#[must_use]
pub fn last_watched_key(course_id: &CourseId) -> String {
    format!("last_watched_{course_id}")
}

/// Typed access to the per-course "last watched lecture" slot.
#[derive(Clone)]
pub struct LastWatchedSlot {
    store: Arc<dyn KeyValueStore>,
}

impl LastWatchedSlot {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the remembered lecture for a course.
    ///
    /// A blank stored value reads as `None`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the slot cannot be read.
    pub async fn load(&self, course_id: &CourseId) -> Result<Option<LectureId>, StorageError> {
        let raw = self.store.get(&last_watched_key(course_id)).await?;
        Ok(raw.and_then(|value| LectureId::new(value).ok()))
    }

    /// Remember `lecture_id` as the last lecture watched in the course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the slot cannot be written.
    pub async fn save(&self, course_id: &CourseId, lecture_id: &LectureId) -> Result<(), StorageError> {
        self.store
            .set(&last_watched_key(course_id), lecture_id.as_str())
            .await
    }

    /// Forget the remembered lecture for a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the slot cannot be written.
    pub async fn clear(&self, course_id: &CourseId) -> Result<(), StorageError> {
        self.store.remove(&last_watched_key(course_id)).await
    }
}

/// Simple in-memory store for tests and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryRepository {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .slots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .slots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .slots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Aggregates storage backends behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub slots: Arc<dyn KeyValueStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let slots: Arc<dyn KeyValueStore> = Arc::new(InMemoryRepository::new());
        Self { slots }
    }

    #[must_use]
    pub fn last_watched(&self) -> LastWatchedSlot {
        LastWatchedSlot::new(Arc::clone(&self.slots))
    }
}
