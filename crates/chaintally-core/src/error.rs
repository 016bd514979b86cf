//! Error types for the tally pipeline.

use thiserror::Error;

/// Errors that can occur while fetching chain data or persisting state.
#[derive(Debug, Error)]
pub enum TallyError {
    /// HTTP request failed (connection refused, non-2xx status, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request timed out after the configured duration.
    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Parse(String),

    /// JSON (de)serialization failed.
    #[error("deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// Checkpoint or snapshot file I/O failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl TallyError {
    /// Returns `true` if this error is transient and worth retrying.
    ///
    /// Transport failures, timeouts and malformed bodies all qualify; a
    /// storage failure does not — the caller falls back to in-memory state.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Timeout { .. } | Self::Parse(_) | Self::Deserialization(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_retryable() {
        assert!(TallyError::Http("503".into()).is_retryable());
        assert!(TallyError::Timeout { ms: 30_000 }.is_retryable());
        assert!(TallyError::Parse("missing field".into()).is_retryable());
    }

    #[test]
    fn storage_errors_are_not_retryable() {
        assert!(!TallyError::Storage("read-only filesystem".into()).is_retryable());
    }
}
