//! Persistence of the last conversion
//!
//! The snapshot is opaque to the engine: it is stored exactly as the
//! client sends it. The file format uses the same camelCase keys the
//! browser front end wrote to local storage.

use std::io;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use conversor_units::Conversion;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("snapshot is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// Key/value slot holding at most one saved conversion
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, snapshot: &Conversion) -> Result<(), SnapshotError>;

    /// `None` when nothing has been saved
    async fn load(&self) -> Result<Option<Conversion>, SnapshotError>;

    async fn clear(&self) -> Result<(), SnapshotError>;
}

/// Snapshot kept in a single JSON file
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn save(&self, snapshot: &Conversion) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<Conversion>, SnapshotError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<(), SnapshotError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store, lost on exit
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Conversion>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn save(&self, snapshot: &Conversion) -> Result<(), SnapshotError> {
        *self.slot.lock().await = Some(snapshot.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<Conversion>, SnapshotError> {
        Ok(self.slot.lock().await.clone())
    }

    async fn clear(&self) -> Result<(), SnapshotError> {
        *self.slot.lock().await = None;
        Ok(())
    }
}
