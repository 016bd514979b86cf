//! Checkpoint persistence — the tally's position for crash recovery.
//!
//! The checkpoint stores the last fully processed block and the running
//! transaction total. On restart the reconciler resumes from it instead
//! of re-counting from the seed block. Both counters are monotonically
//! non-decreasing for the life of the process.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TallyError;

/// The persisted tally position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Last fully processed block number.
    pub current_block: u64,
    /// Cumulative transaction count up to and including `current_block`.
    pub total_transactions: u64,
    /// Time of the last successful advance.
    pub last_update: DateTime<Utc>,
}

impl Checkpoint {
    /// Seed checkpoint used on first run or when the state file is
    /// unreadable.
    pub fn seed(block: u64, transactions: u64) -> Self {
        Self {
            current_block: block,
            total_transactions: transactions,
            last_update: Utc::now(),
        }
    }
}

/// Trait for storing and loading the checkpoint.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the persisted checkpoint. `Ok(None)` when none exists yet;
    /// `Err` when the stored content is unreadable or corrupt.
    async fn load(&self) -> Result<Option<Checkpoint>, TallyError>;

    /// Save the checkpoint, overwriting prior content.
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), TallyError>;
}

/// Write via a sibling temp file and rename, so a reader never observes
/// a partial document. Creates missing parent directories.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

/// File-backed store holding the checkpoint as a small JSON document.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CheckpointStore for JsonFileStore {
    async fn load(&self) -> Result<Option<Checkpoint>, TallyError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TallyError::Storage(e.to_string())),
        };
        let checkpoint = serde_json::from_slice(&bytes)?;
        Ok(Some(checkpoint))
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), TallyError> {
        let json = serde_json::to_vec_pretty(checkpoint)?;
        write_atomic(&self.path, &json).map_err(|e| TallyError::Storage(e.to_string()))
    }
}

// ─── In-memory store (for testing) ────────────────────────────────────────────

/// In-memory checkpoint store for tests. Clones share the same state so
/// a test can hand one to the reconciler and inspect the other.
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    checkpoint: Option<Checkpoint>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently stored checkpoint, if any.
    pub fn get(&self) -> Option<Checkpoint> {
        self.inner.lock().unwrap().checkpoint.clone()
    }

    /// How many times `save` has been called.
    pub fn save_count(&self) -> usize {
        self.inner.lock().unwrap().saves
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    async fn load(&self) -> Result<Option<Checkpoint>, TallyError> {
        Ok(self.inner.lock().unwrap().checkpoint.clone())
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), TallyError> {
        let mut inner = self.inner.lock().unwrap();
        inner.checkpoint = Some(checkpoint.clone());
        inner.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed(block: u64, total: u64) -> Checkpoint {
        Checkpoint {
            current_block: block,
            total_transactions: total,
            last_update: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_none());

        let cp = fixed(1000, 50_000);
        store.save(&cp).await.unwrap();

        assert_eq!(store.load().await.unwrap().unwrap(), cp);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn file_store_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_corrupt_content_is_err() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"not json at all").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = JsonFileStore::new(&path);

        let cp = fixed(24_080_721, 301_259_930);
        store.save(&cp).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, cp);

        // Overwrite with a newer checkpoint
        let newer = fixed(24_080_800, 301_260_930);
        store.save(&newer).await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap(), newer);
    }

    #[tokio::test]
    async fn file_store_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("state.json");
        let store = JsonFileStore::new(&path);

        store.save(&fixed(1, 1)).await.unwrap();
        assert!(path.exists());
    }

    #[test]
    fn seed_uses_given_values() {
        let cp = Checkpoint::seed(24_080_721, 301_259_930);
        assert_eq!(cp.current_block, 24_080_721);
        assert_eq!(cp.total_transactions, 301_259_930);
    }

    #[test]
    fn checkpoint_wire_shape() {
        let json = serde_json::to_value(fixed(100, 1000)).unwrap();
        assert!(json.get("current_block").is_some());
        assert!(json.get("total_transactions").is_some());
        assert!(json.get("last_update").is_some());
    }
}
