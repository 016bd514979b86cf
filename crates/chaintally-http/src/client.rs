//! Blockscout v2 client backed by `reqwest`.
//!
//! Two plain GET endpoints feed the tally:
//! - `GET {base}/stats` — chain-wide stats; `total_blocks` is the head
//!   height (Blockscout serves it as a decimal string)
//! - `GET {base}/blocks/{n}` — per-block stats; `tx_count` is that
//!   block's transaction count
//!
//! Every request runs through a bounded fixed-delay retry loop. Transport
//! and parse failures are both retried; after the attempt budget is spent
//! the error surfaces to the reconciler, which applies its own
//! degradation policy.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use chaintally_core::chain::ChainSource;
use chaintally_core::config::TallyConfig;
use chaintally_core::error::TallyError;
use chaintally_core::retry::RetryPolicy;

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(deserialize_with = "u64_lenient")]
    total_blocks: u64,
}

/// Per-block stats — ephemeral, fetched on demand, never persisted.
#[derive(Debug, Deserialize)]
struct BlockResponse {
    #[serde(deserialize_with = "u64_lenient")]
    tx_count: u64,
}

/// Accept both JSON numbers and decimal strings; Blockscout uses strings
/// for chain-wide counters and numbers for per-block ones.
fn u64_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    match &value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| Error::custom(format!("expected unsigned integer, got {n}"))),
        serde_json::Value::String(s) => s
            .parse::<u64>()
            .map_err(|e| Error::custom(format!("invalid integer string {s:?}: {e}"))),
        other => Err(Error::custom(format!(
            "expected number or string, got {other}"
        ))),
    }
}

/// HTTP chain source with built-in bounded retry.
pub struct HttpChainSource {
    base: String,
    http: reqwest::Client,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl HttpChainSource {
    pub fn new(config: &TallyConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("failed to build reqwest client");

        Self {
            base: config.api_base.trim_end_matches('/').to_string(),
            http,
            retry: RetryPolicy::new(config.retry.clone()),
            request_timeout: config.request_timeout,
        }
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &str) -> Result<T, TallyError> {
        let resp = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                TallyError::Timeout {
                    ms: self.request_timeout.as_millis() as u64,
                }
            } else {
                TallyError::Http(e.to_string())
            }
        })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TallyError::Http(format!("HTTP {status}: {body}")));
        }

        resp.json::<T>()
            .await
            .map_err(|e| TallyError::Parse(e.to_string()))
    }

    async fn get_with_retry<T: DeserializeOwned>(&self, url: &str) -> Result<T, TallyError> {
        let mut failed = 0u32;
        loop {
            match self.get_once(url).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    failed += 1;
                    match self.retry.next_delay(failed) {
                        Some(delay) => {
                            tracing::warn!(
                                attempt = failed,
                                delay_ms = delay.as_millis() as u64,
                                error = %e,
                                url,
                                "retrying request"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            tracing::error!(attempts = failed, error = %e, url, "retries exhausted");
                            return Err(e);
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl ChainSource for HttpChainSource {
    async fn head_height(&self) -> Result<u64, TallyError> {
        let url = format!("{}/stats", self.base);
        let stats: StatsResponse = self.get_with_retry(&url).await?;
        Ok(stats.total_blocks)
    }

    async fn block_tx_count(&self, number: u64) -> Result<u64, TallyError> {
        let url = format!("{}/blocks/{number}", self.base);
        let block: BlockResponse = self.get_with_retry(&url).await?;
        Ok(block.tx_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaintally_core::retry::RetryConfig;

    fn source_for(server: &mockito::ServerGuard, max_attempts: u32) -> HttpChainSource {
        let config = TallyConfig {
            api_base: server.url(),
            retry: RetryConfig {
                max_attempts,
                delay: Duration::ZERO,
            },
            ..TallyConfig::default()
        };
        HttpChainSource::new(&config)
    }

    #[test]
    fn stats_total_blocks_accepts_string() {
        let stats: StatsResponse =
            serde_json::from_str(r#"{"total_blocks": "24080721", "total_transactions": "1"}"#)
                .unwrap();
        assert_eq!(stats.total_blocks, 24_080_721);
    }

    #[test]
    fn stats_total_blocks_accepts_number() {
        let stats: StatsResponse = serde_json::from_str(r#"{"total_blocks": 24080721}"#).unwrap();
        assert_eq!(stats.total_blocks, 24_080_721);
    }

    #[test]
    fn non_numeric_total_blocks_is_rejected() {
        assert!(serde_json::from_str::<StatsResponse>(r#"{"total_blocks": "soon"}"#).is_err());
        assert!(serde_json::from_str::<StatsResponse>(r#"{"total_blocks": null}"#).is_err());
    }

    #[tokio::test]
    async fn head_height_parses_stats_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/stats")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"total_blocks": "24080725", "average_block_time": 10043}"#)
            .create_async()
            .await;

        let source = source_for(&server, 1);
        assert_eq!(source.head_height().await.unwrap(), 24_080_725);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn block_tx_count_parses_block_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/blocks/24080725")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"height": 24080725, "tx_count": 42}"#)
            .create_async()
            .await;

        let source = source_for(&server, 1);
        assert_eq!(source.block_tx_count(24_080_725).await.unwrap(), 42);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_exhaustion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/stats")
            .with_status(503)
            .with_body("upstream unavailable")
            .expect(3)
            .create_async()
            .await;

        let source = source_for(&server, 3);
        let err = source.head_height().await.unwrap_err();
        assert!(matches!(err, TallyError::Http(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_body_is_retried_then_surfaces_as_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/blocks/5")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"height": 5}"#)
            .expect(2)
            .create_async()
            .await;

        let source = source_for(&server, 2);
        let err = source.block_tx_count(5).await.unwrap_err();
        assert!(matches!(err, TallyError::Parse(_)));
        mock.assert_async().await;
    }
}
