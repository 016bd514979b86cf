//! The `ChainSource` trait — what the reconciler needs from the explorer.
//!
//! Both methods return an explicit `Err` when the fetch ultimately fails,
//! so the reconciler can tell "no new data" apart from "fetch failed" and
//! apply its own degradation policy: a missing head skips the cycle, a
//! missing per-block count contributes zero.

use async_trait::async_trait;

use crate::error::TallyError;

/// Read-only view of the chain explorer API.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Current chain head height.
    async fn head_height(&self) -> Result<u64, TallyError>;

    /// Number of transactions in block `number`.
    async fn block_tx_count(&self, number: u64) -> Result<u64, TallyError>;
}
