use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::RwLock;

use uuid::Uuid;

use crate::errors::StoreError;
use crate::model::{BackupArtifact, BackupId, BackupSummary};

/// Persistence contract for backup artifacts. Writes must be durable before
/// `put` returns, identifiers are never reused, and `get` after a successful
/// `put` always returns the same content. Implementations must tolerate
/// concurrent `put`/`get`.
pub trait BackupStore: Send + Sync {
    fn put(&self, artifact: &BackupArtifact) -> Result<(), StoreError>;

    fn get(&self, id: BackupId) -> Result<BackupArtifact, StoreError>;

    /// Summaries of every stored artifact, oldest first.
    fn list(&self) -> Result<Vec<BackupSummary>, StoreError>;
}

#[derive(Default)]
pub struct MemoryBackupStore {
    artifacts: RwLock<HashMap<BackupId, BackupArtifact>>,
}

impl MemoryBackupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackupStore for MemoryBackupStore {
    fn put(&self, artifact: &BackupArtifact) -> Result<(), StoreError> {
        let mut artifacts = self.artifacts.write().unwrap_or_else(|e| e.into_inner());
        if artifacts.contains_key(&artifact.backup_id) {
            return Err(StoreError::IdAlreadyExists(artifact.backup_id));
        }
        artifacts.insert(artifact.backup_id, artifact.clone());
        Ok(())
    }

    fn get(&self, id: BackupId) -> Result<BackupArtifact, StoreError> {
        self.artifacts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn list(&self) -> Result<Vec<BackupSummary>, StoreError> {
        let mut summaries: Vec<BackupSummary> = self
            .artifacts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(BackupSummary::from)
            .collect();
        summaries.sort_by_key(|s| s.created_at);
        Ok(summaries)
    }
}

/// One JSON file per backup id under a root directory. Files are written to
/// a temporary name, synced, then published under the id with a no-replace
/// link, so an artifact is never visible half-written and a duplicate id
/// can never overwrite an existing artifact.
pub struct FsBackupStore {
    root: PathBuf,
}

impl FsBackupStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(FsBackupStore { root })
    }

    fn artifact_path(&self, id: BackupId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }
}

impl BackupStore for FsBackupStore {
    fn put(&self, artifact: &BackupArtifact) -> Result<(), StoreError> {
        let path = self.artifact_path(artifact.backup_id);
        let json = serde_json::to_string_pretty(artifact)?;
        let tmp = self
            .root
            .join(format!("{}.{}.tmp", artifact.backup_id, Uuid::new_v4().simple()));
        let mut file = File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        // hard_link fails with AlreadyExists instead of replacing, so two
        // racing puts of one id cannot both succeed.
        let published = fs::hard_link(&tmp, &path);
        let _ = fs::remove_file(&tmp);
        match published {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                Err(StoreError::IdAlreadyExists(artifact.backup_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get(&self, id: BackupId) -> Result<BackupArtifact, StoreError> {
        let path = self.artifact_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn list(&self) -> Result<Vec<BackupSummary>, StoreError> {
        let mut summaries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !is_artifact_file(&path) {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            let artifact: BackupArtifact = serde_json::from_str(&content)?;
            summaries.push(BackupSummary::from(&artifact));
        }
        summaries.sort_by_key(|s| s.created_at);
        Ok(summaries)
    }
}

// Only `<uuid>.json` counts; leftover tmp files and strangers are skipped.
fn is_artifact_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
        && path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|stem| BackupId::from_str(stem).is_ok())
}
