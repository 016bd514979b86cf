//! Runtime configuration.
//!
//! ChainTally takes no flags and reads no environment variables: the
//! defaults below are the production constants, and tests substitute
//! their own record.

use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryConfig;

/// Immutable configuration, constructed once at startup and passed into
/// each component.
#[derive(Debug, Clone)]
pub struct TallyConfig {
    /// Blockscout v2 API base URL.
    pub api_base: String,
    /// Path of the persisted checkpoint file.
    pub state_path: PathBuf,
    /// Path of the published snapshot file.
    pub output_path: PathBuf,
    /// Timeout applied to each HTTP request.
    pub request_timeout: Duration,
    /// Retry schedule for chain fetches.
    pub retry: RetryConfig,
    /// Sleep between reconciliation cycles.
    pub poll_interval: Duration,
    /// Log a progress line every this many blocks during catch-up.
    pub progress_every: u64,
    /// Most blocks to walk in one cycle; `None` walks all the way to the
    /// head. A bounded batch still commits all-or-nothing, the next cycle
    /// picks up where this one stopped.
    pub max_batch_blocks: Option<u64>,
    /// Block the tally starts from when no checkpoint exists.
    pub seed_block: u64,
    /// Cumulative transaction count at `seed_block`.
    pub seed_transactions: u64,
    /// PulseChain fork block, for the `blocks_since_fork` figure.
    pub fork_block: u64,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.scan.pulsechain.com/api/v2".into(),
            state_path: "/tmp/pulsechain_state.json".into(),
            output_path: "/var/www/html/totaltxns.json".into(),
            request_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            poll_interval: Duration::from_secs(300),
            progress_every: 100,
            max_batch_blocks: None,
            seed_block: 24_080_721,
            seed_transactions: 301_259_930,
            fork_block: 17_233_000,
        }
    }
}
