use rust_decimal::Decimal;

use crate::config::AppConfig;
use crate::error::{LedgerError, ValidationError};
use crate::logging::{LogContext, MetricsLogger, PerformanceMonitor};
use crate::models::{Block, ExtractedLedger};
use crate::retry::{RetryConfig, RetryUtils};
use crate::tezos::explorer_client::{ExplorerClient, TzktClient};
use crate::tezos::extractor::{BlockOperationExtractor, ExtractorOptions};

/// Fetches blocks from an explorer and runs them through the extractor
pub struct BlockProcessor<C> {
    client: C,
    extractor: BlockOperationExtractor,
    retry_config: RetryConfig,
}

impl<C: ExplorerClient> BlockProcessor<C> {
    pub fn new(client: C, extractor: BlockOperationExtractor) -> Self {
        Self {
            client,
            extractor,
            retry_config: RetryConfig::for_explorer(),
        }
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn extractor(&self) -> &BlockOperationExtractor {
        &self.extractor
    }

    /// Fetch one block, retrying transient explorer failures
    pub async fn fetch_block(&self, level: u64) -> Result<Block, LedgerError> {
        RetryUtils::retry_with_config("get_block_txs", self.retry_config.clone(), || async move {
            self.client.get_block_txs(level).await.map_err(LedgerError::from)
        }).await
    }

    /// Current head level, retrying transient explorer failures
    pub async fn head_level(&self) -> Result<u64, LedgerError> {
        RetryUtils::retry_with_config("get_head_level", self.retry_config.clone(), || async move {
            self.client.get_head_level().await.map_err(LedgerError::from)
        }).await
    }

    /// Recent transactions of an address, extracted into a ledger
    pub async fn process_address(&self, address: &str, limit: u32) -> Result<ExtractedLedger, LedgerError> {
        let operations = RetryUtils::retry_with_config("get_address_txs", self.retry_config.clone(), || async move {
            self.client.get_address_txs(address, limit).await.map_err(LedgerError::from)
        }).await?;

        Ok(self.extractor.extract_operations(&operations, None)?)
    }

    /// Balance of an address in human units of the extractor's currency
    pub async fn balance(&self, address: &str) -> Result<Decimal, LedgerError> {
        let raw = RetryUtils::retry_with_config("get_balance", self.retry_config.clone(), || async move {
            self.client.get_balance(address).await.map_err(LedgerError::from)
        }).await?;

        Ok(self.extractor.currency().to_human_units(raw)?)
    }

    /// Fetch and extract a single block
    pub async fn process_block(&self, level: u64) -> Result<ExtractedLedger, LedgerError> {
        let monitor = PerformanceMonitor::new("process_block")
            .with_metadata("block_level", serde_json::json!(level));

        let block = self.fetch_block(level).await?;
        let result = self.extractor.extract(std::slice::from_ref(&block));
        let duration = monitor.finish_with_result(&result);

        let ledger = result.map_err(|e| {
            LogContext::new("block_processor", "process_block")
                .with_level(level)
                .with_metadata("block_hash", serde_json::json!(block.hash))
                .error(&format!("Extraction failed: {}", e));
            e
        })?;

        MetricsLogger::log_block_extracted(level, block.transactions.len(), ledger.record_count(), duration);
        Ok(ledger)
    }

    /// Fetch and extract the inclusive range `from..=to`, in ascending order
    pub async fn process_range(&self, from: u64, to: u64) -> Result<ExtractedLedger, LedgerError> {
        if from > to {
            return Err(ValidationError::InvalidLevel(format!(
                "range start {} is after range end {}",
                from, to
            )).into());
        }

        let mut ledger = ExtractedLedger::new();
        for level in from..=to {
            ledger.merge(self.process_block(level).await?);
        }
        Ok(ledger)
    }
}

impl BlockProcessor<TzktClient> {
    /// Build a processor talking to the configured TzKT endpoint
    pub fn from_config(config: &AppConfig) -> Result<Self, LedgerError> {
        let client = TzktClient::new_with_config(&config.explorer.endpoint, config.explorer.timeout_seconds)?;
        let extractor = BlockOperationExtractor::with_options(
            config.currency.to_currency(),
            ExtractorOptions {
                include_internal: config.processing.include_internal_operations,
            },
        );

        Ok(Self::new(client, extractor).with_retry_config(RetryConfig::from(&config.explorer)))
    }
}
