//! Snapshot rendering and publication.
//!
//! Downstream consumers poll a static JSON file. That file must always
//! parse, always report `status: "success"`, and never be torn or
//! deleted: failures degrade to stale-but-valid data with a `warning`
//! attached instead of surfacing an error payload.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checkpoint::{write_atomic, Checkpoint};
use crate::error::TallyError;

/// The published document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub status: String,
    pub data: SnapshotData,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// The denormalized tally figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotData {
    pub total_transactions: u64,
    pub current_block: u64,
    pub blocks_since_fork: u64,
    pub last_update: DateTime<Utc>,
}

/// Render a checkpoint into the public document. Pure and infallible;
/// the status is always `"success"`.
pub fn render(checkpoint: &Checkpoint, fork_block: u64, warning: Option<String>) -> Snapshot {
    Snapshot {
        status: "success".into(),
        data: SnapshotData {
            total_transactions: checkpoint.total_transactions,
            current_block: checkpoint.current_block,
            blocks_since_fork: checkpoint.current_block.saturating_sub(fork_block),
            last_update: checkpoint.last_update,
        },
        timestamp: Utc::now(),
        warning,
    }
}

/// Writes snapshots to the well-known output path.
pub struct SnapshotWriter {
    path: PathBuf,
    fork_block: u64,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>, fork_block: u64) -> Self {
        Self {
            path: path.into(),
            fork_block,
        }
    }

    /// Publish a snapshot. On write failure, attempt one fallback write
    /// rendered from the cached checkpoint with the error as warning; if
    /// even that fails, log and leave the previous file untouched.
    ///
    /// Returns `true` when the primary write landed.
    pub fn publish(&self, snapshot: &Snapshot, cached: &Checkpoint) -> bool {
        match self.write(snapshot) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "snapshot published");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "snapshot write failed, attempting fallback");
                let fallback = render(cached, self.fork_block, Some(e.to_string()));
                if let Err(e) = self.write(&fallback) {
                    tracing::error!(error = %e, "fallback snapshot write failed");
                }
                false
            }
        }
    }

    fn write(&self, snapshot: &Snapshot) -> Result<(), TallyError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        write_atomic(&self.path, &json).map_err(|e| TallyError::Storage(e.to_string()))
    }
}
