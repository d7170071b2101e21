//! Snapshot persistence for the alias registry.
//!
//! This module provides the `SnapshotPersistence` service, which saves the latest
//! registry snapshot to disk after each rebuild and restores it on startup. A
//! repository trait abstracts the file layout, so the engine worker only deals
//! with registries and metadata.
//!
//! Restored snapshots serve reads while the backfill replays the real candidate
//! history; the first rebuild after backfill replaces them.

use crate::alias::registry::AliasRegistry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Error types for snapshot persistence.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Metadata stored alongside a registry snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    /// Chain tip at the time of the snapshot, if known.
    pub tip_height: Option<u32>,
    /// RFC 3339 timestamp of when the snapshot was written.
    pub saved_at: String,
    /// Number of aliases in the snapshot.
    pub aliases: usize,
}

/// Repository abstraction for registry snapshots.
#[async_trait]
pub trait SnapshotRepository {
    /// Persist a snapshot and its metadata.
    async fn save(
        &self,
        registry: &AliasRegistry,
        meta: &SnapshotMeta,
    ) -> Result<(), StorageError>;

    /// Load the persisted snapshot, if one exists.
    async fn load(&self) -> Result<Option<(AliasRegistry, SnapshotMeta)>, StorageError>;
}

/// File-based snapshot repository.
///
/// Writes `alias_registry.json` and `alias_registry.meta.json` into the data
/// directory. The registry file is written via a temp file and rename so a
/// crash mid-write never leaves a truncated snapshot behind.
pub struct FileSnapshotRepository {
    data_dir: PathBuf,
}

impl FileSnapshotRepository {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn registry_path(&self) -> PathBuf {
        self.data_dir.join("alias_registry.json")
    }

    fn meta_path(&self) -> PathBuf {
        self.data_dir.join("alias_registry.meta.json")
    }
}

#[async_trait]
impl SnapshotRepository for FileSnapshotRepository {
    async fn save(
        &self,
        registry: &AliasRegistry,
        meta: &SnapshotMeta,
    ) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;

        let registry_json = serde_json::to_vec_pretty(registry)?;
        let tmp_path = self.data_dir.join("alias_registry.json.tmp");
        tokio::fs::write(&tmp_path, &registry_json).await?;
        tokio::fs::rename(&tmp_path, self.registry_path()).await?;

        let meta_json = serde_json::to_vec_pretty(meta)?;
        tokio::fs::write(self.meta_path(), &meta_json).await?;

        Ok(())
    }

    async fn load(&self) -> Result<Option<(AliasRegistry, SnapshotMeta)>, StorageError> {
        let registry_bytes = match tokio::fs::read(self.registry_path()).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let registry: AliasRegistry = serde_json::from_slice(&registry_bytes)?;

        let meta = match tokio::fs::read(self.meta_path()).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Registry without metadata is still usable.
                warn!("Snapshot metadata missing, continuing without it");
                SnapshotMeta {
                    tip_height: None,
                    saved_at: String::new(),
                    aliases: registry.len(),
                }
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Some((registry, meta)))
    }
}

/// Service for saving and restoring registry snapshots.
pub struct SnapshotPersistence {
    repo: Box<dyn SnapshotRepository + Send + Sync>,
}

impl SnapshotPersistence {
    /// Create a file-backed persistence service for the given data directory.
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            repo: Box::new(FileSnapshotRepository::new(data_dir)),
        }
    }

    /// Persist the registry together with fresh metadata.
    pub async fn save(
        &self,
        registry: &AliasRegistry,
        tip_height: Option<u32>,
    ) -> Result<(), StorageError> {
        let meta = SnapshotMeta {
            tip_height,
            saved_at: chrono::Utc::now().to_rfc3339(),
            aliases: registry.len(),
        };
        self.repo.save(registry, &meta).await
    }

    /// Restore the persisted registry, if any.
    pub async fn restore(&self) -> Result<Option<(AliasRegistry, SnapshotMeta)>, StorageError> {
        match self.repo.load().await? {
            Some((registry, meta)) => {
                info!(
                    aliases = registry.len(),
                    tip_height = ?meta.tip_height,
                    "Loaded registry snapshot from disk"
                );
                Ok(Some((registry, meta)))
            }
            None => Ok(None),
        }
    }
}
