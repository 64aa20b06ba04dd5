use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::ExplorerError;
use crate::logging::{LogContext, MetricsLogger, PerformanceMonitor};
use crate::models::{Block, Head, TransactionOp};

/// Rate-limit back-off used when TzKT omits `Retry-After`
const DEFAULT_RATE_LIMIT_SECONDS: u64 = 60;

/// Read-only view of a Tezos block explorer.
///
/// The block processor and the monitor are generic over this trait, so
/// tests can swap in an in-memory explorer.
pub trait ExplorerClient: Send + Sync {
    /// Level of the current chain head
    fn get_head_level(&self) -> impl Future<Output = Result<u64, ExplorerError>> + Send;

    /// Block at `level` with its operation arrays populated
    fn get_block_txs(&self, level: u64) -> impl Future<Output = Result<Block, ExplorerError>> + Send;

    /// Most recent transaction operations touching `address`
    fn get_address_txs(
        &self,
        address: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<TransactionOp>, ExplorerError>> + Send;

    /// Spendable balance in the smallest currency unit
    fn get_balance(&self, address: &str) -> impl Future<Output = Result<u64, ExplorerError>> + Send;
}

/// reqwest-backed client for the TzKT REST API
#[derive(Clone)]
pub struct TzktClient {
    client: Client,
    endpoint: String,
    timeout_seconds: u64,
}

impl TzktClient {
    pub fn new(endpoint: &str) -> Result<Self, ExplorerError> {
        Self::new_with_config(endpoint, 30)
    }

    pub fn new_with_config(endpoint: &str, timeout_seconds: u64) -> Result<Self, ExplorerError> {
        LogContext::new("tzkt_client", "initialization")
            .with_metadata("endpoint", serde_json::json!(endpoint))
            .with_metadata("timeout_seconds", serde_json::json!(timeout_seconds))
            .info("Initializing TzKT client");

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout_seconds,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn classify(&self, error: reqwest::Error) -> ExplorerError {
        if error.is_timeout() {
            ExplorerError::Timeout { seconds: self.timeout_seconds }
        } else if error.is_connect() {
            ExplorerError::Connection(error.to_string())
        } else {
            ExplorerError::Http(error)
        }
    }

    /// GET `path` and decode the JSON body. `Ok(None)` means TzKT answered
    /// 204 or with a literal `null`.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ExplorerError> {
        let url = self.url(path);
        let monitor = PerformanceMonitor::new("tzkt_get")
            .with_metadata("path", serde_json::json!(path));

        let result = self.fetch(&url).await;
        let duration = monitor.finish_with_result(&result);
        MetricsLogger::log_explorer_call(path, duration, result.is_ok());

        let body = match result? {
            Some(body) => body,
            None => return Ok(None),
        };

        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(trimmed)?))
    }

    async fn fetch(&self, url: &str) -> Result<Option<String>, ExplorerError> {
        LogContext::new("tzkt_client", "fetch")
            .with_metadata("url", serde_json::json!(url))
            .trace("Sending TzKT request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let seconds = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT_SECONDS);
            return Err(ExplorerError::RateLimit { seconds });
        }
        if !status.is_success() {
            return Err(ExplorerError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        Ok(Some(body))
    }
}

impl ExplorerClient for TzktClient {
    async fn get_head_level(&self) -> Result<u64, ExplorerError> {
        let head: Head = self
            .get_json("/v1/head")
            .await?
            .ok_or_else(|| ExplorerError::InvalidResponse("Empty head response".to_string()))?;

        LogContext::new("tzkt_client", "get_head_level")
            .with_level(head.level)
            .debug(&format!("Retrieved head level: {}", head.level));

        Ok(head.level)
    }

    async fn get_block_txs(&self, level: u64) -> Result<Block, ExplorerError> {
        let path = format!("/v1/blocks/{}?operations=true", level);
        let block: Block = self
            .get_json(&path)
            .await?
            .ok_or(ExplorerError::BlockNotFound { level })?;

        LogContext::new("tzkt_client", "get_block_txs")
            .with_level(level)
            .with_metadata("transaction_count", serde_json::json!(block.transactions.len()))
            .debug(&format!("Retrieved block {} with {} transactions", level, block.transactions.len()));

        Ok(block)
    }

    async fn get_address_txs(&self, address: &str, limit: u32) -> Result<Vec<TransactionOp>, ExplorerError> {
        let path = format!("/v1/accounts/{}/operations?type=transaction&limit={}", address, limit);
        let ops: Vec<TransactionOp> = self.get_json(&path).await?.unwrap_or_default();

        LogContext::new("tzkt_client", "get_address_txs")
            .with_address(address)
            .with_metadata("operation_count", serde_json::json!(ops.len()))
            .debug(&format!("Retrieved {} operations for {}", ops.len(), address));

        Ok(ops)
    }

    async fn get_balance(&self, address: &str) -> Result<u64, ExplorerError> {
        let path = format!("/v1/accounts/{}/balance", address);
        Ok(self.get_json(&path).await?.unwrap_or(0))
    }
}
