//! Storage backends for the connection store.

use crate::error::StoreError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{io, path::PathBuf};

/// Where the serialized connection snapshot lives.
///
/// `load` distinguishes "nothing persisted yet" (`Ok(None)`) from backend
/// failure; snapshot validity is the store's concern, not the backend's.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    async fn load(&self) -> Result<Option<String>, StoreError>;
    async fn store(&self, payload: String) -> Result<(), StoreError>;
}

/// Snapshot persisted as a JSON file, written via a sibling temp file and
/// rename so readers never observe a half-written snapshot.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StorageBackend for JsonFileStorage {
    async fn load(&self) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn store(&self, payload: String) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, payload).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    value: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the backend with an existing snapshot.
    pub fn with_value(value: impl Into<String>) -> Self {
        Self { value: Mutex::new(Some(value.into())) }
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.value.lock().clone())
    }

    async fn store(&self, payload: String) -> Result<(), StoreError> {
        *self.value.lock() = Some(payload);
        Ok(())
    }
}
