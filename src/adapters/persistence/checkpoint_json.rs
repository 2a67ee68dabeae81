//! Implements CheckpointStore using a JSON file.
//!
//! Tracks processed, failed and skipped page ids so an interrupted
//! migration can resume without re-editing pages that already landed.

use crate::domain::DomainError;
use crate::ports::CheckpointStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Processed pages are flushed in batches of this size. Failures flush
/// immediately, so at most the last nine successes can be replayed after a
/// crash, and replaying an edit is harmless.
const SAVE_EVERY: usize = 10;

#[derive(Debug, Serialize, Deserialize)]
struct FailureRecord {
    error: String,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CheckpointData {
    processed: HashSet<i64>,
    failed: HashMap<i64, FailureRecord>,
    skipped: HashMap<i64, String>,
    started_at: Option<DateTime<Utc>>,
}

impl CheckpointData {
    fn fresh() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }
}

/// JSON file-based migration checkpoint.
pub struct CheckpointJson {
    path: std::path::PathBuf,
    cache: tokio::sync::RwLock<CheckpointData>,
}

impl CheckpointJson {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cache: tokio::sync::RwLock::new(CheckpointData::default()),
        }
    }

    /// Load checkpoint state from disk. A missing or unreadable file starts
    /// a fresh run.
    pub async fn load(&self) -> Result<(), DomainError> {
        let data = match fs::read_to_string(&self.path).await {
            Ok(s) => match serde_json::from_str::<CheckpointData>(&s) {
                Ok(data) => {
                    info!(
                        processed = data.processed.len(),
                        path = %self.path.display(),
                        "resuming migration from checkpoint"
                    );
                    data
                }
                Err(e) => {
                    warn!(error = %e, "checkpoint file unreadable, starting fresh");
                    CheckpointData::fresh()
                }
            },
            Err(_) => CheckpointData::fresh(),
        };
        *self.cache.write().await = data;
        Ok(())
    }

    /// Atomic save: write a temp file, fsync, rename over the target. A
    /// crash mid-write leaves the previous checkpoint intact.
    async fn save(&self) -> Result<(), DomainError> {
        let data = self.cache.read().await;
        let json =
            serde_json::to_string_pretty(&*data).map_err(|e| DomainError::State(e.to_string()))?;

        let temp_path = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&temp_path)
            .await
            .map_err(|e| DomainError::State(format!("create temp file: {}", e)))?;
        f.write_all(json.as_bytes())
            .await
            .map_err(|e| DomainError::State(format!("write temp file: {}", e)))?;
        f.sync_all()
            .await
            .map_err(|e| DomainError::State(format!("sync temp file: {}", e)))?;
        drop(f);

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| DomainError::State(format!("atomic rename failed: {}", e)))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl CheckpointStore for CheckpointJson {
    async fn is_processed(&self, page_id: i64) -> Result<bool, DomainError> {
        let cache = self.cache.read().await;
        Ok(cache.processed.contains(&page_id))
    }

    async fn mark_processed(&self, page_id: i64) -> Result<(), DomainError> {
        let should_save = {
            let mut cache = self.cache.write().await;
            cache.processed.insert(page_id);
            cache.processed.len() % SAVE_EVERY == 0
        };
        if should_save {
            self.save().await?;
        }
        Ok(())
    }

    async fn mark_failed(&self, page_id: i64, error: &str) -> Result<(), DomainError> {
        {
            let mut cache = self.cache.write().await;
            cache.failed.insert(
                page_id,
                FailureRecord {
                    error: error.to_string(),
                    timestamp: Utc::now(),
                },
            );
        }
        self.save().await
    }

    async fn mark_skipped(&self, page_id: i64, reason: &str) -> Result<(), DomainError> {
        let mut cache = self.cache.write().await;
        cache.skipped.insert(page_id, reason.to_string());
        Ok(())
    }

    async fn processed_count(&self) -> Result<usize, DomainError> {
        let cache = self.cache.read().await;
        Ok(cache.processed.len())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        *self.cache.write().await = CheckpointData::default();
        match fs::remove_file(&self.path).await {
            Ok(()) => info!("migration complete, checkpoint removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(DomainError::State(format!("remove checkpoint: {}", e))),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn failure_flushes_state_to_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");

        let store = CheckpointJson::new(&path);
        store.load().await.unwrap();
        store.mark_processed(1).await.unwrap();
        store.mark_failed(2, "edit rejected").await.unwrap();
        assert!(store.is_processed(1).await.unwrap());

        let reopened = CheckpointJson::new(&path);
        reopened.load().await.unwrap();
        assert!(reopened.is_processed(1).await.unwrap());
        assert!(!reopened.is_processed(3).await.unwrap());
        assert_eq!(reopened.processed_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn persists_every_tenth_processed_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");

        let store = CheckpointJson::new(&path);
        store.load().await.unwrap();
        for id in 1..=9 {
            store.mark_processed(id).await.unwrap();
        }
        assert!(!path.exists());

        store.mark_processed(10).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn clear_removes_checkpoint_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");

        let store = CheckpointJson::new(&path);
        store.load().await.unwrap();
        store.mark_failed(1, "boom").await.unwrap();
        assert!(path.exists());

        store.clear().await.unwrap();
        assert!(!path.exists());
        assert_eq!(store.processed_count().await.unwrap(), 0);

        // Clearing a cleared checkpoint is not an error.
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn unreadable_checkpoint_starts_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        std::fs::write(&path, "not json").unwrap();

        let store = CheckpointJson::new(&path);
        store.load().await.unwrap();
        assert_eq!(store.processed_count().await.unwrap(), 0);
    }
}
