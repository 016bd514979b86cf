//! chaintally-core — foundation types and logic for ChainTally.
//!
//! # Overview
//!
//! ChainTally keeps a running total of PulseChain transactions by tailing
//! a Blockscout explorer API block-by-block from a persisted checkpoint.
//! The core crate defines:
//!
//! - [`ChainSource`] — the async trait every chain backend implements
//! - [`Checkpoint`] / [`CheckpointStore`] — persisted tally position
//! - [`Reconciler`] — one load → fetch → walk → save cycle
//! - [`Snapshot`] / [`SnapshotWriter`] — the published JSON document
//! - [`RetryPolicy`] — bounded fixed-delay retry schedule
//! - [`TallyError`] — structured error type
//! - [`TallyConfig`] — one immutable configuration record

pub mod chain;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod publish;
pub mod reconcile;
pub mod retry;

pub use chain::ChainSource;
pub use checkpoint::{Checkpoint, CheckpointStore, JsonFileStore, MemoryStore};
pub use config::TallyConfig;
pub use error::TallyError;
pub use publish::{render, Snapshot, SnapshotData, SnapshotWriter};
pub use reconcile::{CycleReport, Reconciler};
pub use retry::{RetryConfig, RetryPolicy};
