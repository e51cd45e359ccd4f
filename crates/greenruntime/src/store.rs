use async_trait::async_trait;
use greencore::{Checkpoint, RunId, StoreError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Durable home of the latest checkpoint per run.
///
/// Last write wins per `run_id`. Checkpoints are never deleted by the
/// engine; retention is the store owner's business.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Insert or overwrite the checkpoint for `checkpoint.run_id`
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), StoreError>;

    async fn get(&self, run_id: &RunId) -> Result<Option<Checkpoint>, StoreError>;

    /// Every run with a stored checkpoint, sorted
    async fn list(&self) -> Result<Vec<RunId>, StoreError>;
}

/// Checkpoints kept in process memory
#[derive(Clone, Default)]
pub struct InMemoryCheckpointStore {
    entries: Arc<RwLock<HashMap<RunId, Checkpoint>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(checkpoint.run_id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn get(&self, run_id: &RunId) -> Result<Option<Checkpoint>, StoreError> {
        Ok(self.entries.read().await.get(run_id).cloned())
    }

    async fn list(&self) -> Result<Vec<RunId>, StoreError> {
        let mut ids: Vec<RunId> = self.entries.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// One pretty-printed JSON file per run under a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous checkpoint intact.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub const EXTENSION: &'static str = "json";

    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, run_id: &RunId) -> PathBuf {
        self.dir.join(format!("{}.{}", run_id, Self::EXTENSION))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(checkpoint)?;
        let path = self.path_for(&checkpoint.run_id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::trace!(run_id = %checkpoint.run_id, path = %path.display(), "checkpoint written");
        Ok(())
    }

    async fn get(&self, run_id: &RunId) -> Result<Option<Checkpoint>, StoreError> {
        match tokio::fs::read(self.path_for(run_id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<RunId>, StoreError> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(Self::EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match RunId::parse(stem) {
                Ok(id) => ids.push(id),
                Err(_) => tracing::warn!(path = %path.display(), "skipping file with invalid run id"),
            }
        }
        ids.sort();
        Ok(ids)
    }
}
