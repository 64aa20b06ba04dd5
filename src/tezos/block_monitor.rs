use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::{sleep, interval, MissedTickBehavior};
use tokio::signal;
use thiserror::Error;
use log::{info, warn, error, debug};

use crate::config::ProcessingConfig;
use crate::database::{Database, DbError};
use crate::error::{ConfigError, LedgerError, SystemError};
use crate::logging::MetricsLogger;
use crate::tezos::block_processor::BlockProcessor;
use crate::tezos::explorer_client::ExplorerClient;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Block processing error: {0}")]
    Processing(#[from] LedgerError),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Monitor configuration error: {0}")]
    Config(String),
    #[error("Shutdown requested")]
    Shutdown,
}

impl From<MonitorError> for LedgerError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::Processing(e) => e,
            MonitorError::Database(e) => LedgerError::from(e),
            MonitorError::Config(msg) => LedgerError::Config(ConfigError::InvalidValue {
                key: "monitor".to_string(),
                value: msg,
            }),
            MonitorError::Shutdown => LedgerError::System(SystemError::Signal("shutdown requested".to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlockMonitorConfig {
    pub poll_interval_seconds: u64,
    /// First level to index on an empty database, 0 for "start at head"
    pub start_level: u64,
    pub retry_delay_seconds: u64,
    pub max_levels_per_batch: u32,
}

impl Default for BlockMonitorConfig {
    fn default() -> Self {
        Self::from(&ProcessingConfig::default())
    }
}

impl From<&ProcessingConfig> for BlockMonitorConfig {
    fn from(config: &ProcessingConfig) -> Self {
        Self {
            poll_interval_seconds: config.poll_interval_seconds,
            start_level: config.start_level,
            retry_delay_seconds: config.retry_delay_seconds,
            max_levels_per_batch: config.max_levels_per_batch,
        }
    }
}

/// Follows the chain head and indexes every level exactly once, in order
pub struct BlockMonitor<C> {
    processor: BlockProcessor<C>,
    database: Database,
    pub config: BlockMonitorConfig,
    pub shutdown_signal: Arc<AtomicBool>,
}

impl<C: ExplorerClient> BlockMonitor<C> {
    pub fn new(
        processor: BlockProcessor<C>,
        database: Database,
        config: Option<BlockMonitorConfig>,
    ) -> Self {
        Self {
            processor,
            database,
            config: config.unwrap_or_default(),
            shutdown_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run the polling loop until shutdown is requested.
    ///
    /// Always ends with `Err(MonitorError::Shutdown)` on a clean stop, after the
    /// cursor has been persisted.
    pub async fn start(&self) -> Result<(), MonitorError> {
        if self.config.poll_interval_seconds == 0 {
            return Err(MonitorError::Config("poll interval must be positive".to_string()));
        }

        info!("Starting block monitor with {} second polling interval", self.config.poll_interval_seconds);

        let mut last_processed_level = self.get_starting_level().await?;
        info!("Indexing from level {}", last_processed_level + 1);

        let mut interval = interval(Duration::from_secs(self.config.poll_interval_seconds));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown_signal = Arc::clone(&self.shutdown_signal);
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received shutdown signal");
                    shutdown_signal.store(true, Ordering::Relaxed);
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
        });

        loop {
            if self.shutdown_signal.load(Ordering::Relaxed) {
                info!("Shutdown signal received, stopping block monitor");
                self.persist_state(last_processed_level).await?;
                return Err(MonitorError::Shutdown);
            }

            interval.tick().await;

            match self.catch_up(&mut last_processed_level).await {
                Ok(levels) => {
                    if levels > 0 {
                        debug!("Processed {} new levels, now at {}", levels, last_processed_level);
                    }
                }
                Err(e) => {
                    warn!("Error while following the head: {}", e);
                    sleep(Duration::from_secs(self.config.retry_delay_seconds)).await;
                }
            }
        }
    }

    /// Process levels after `last_processed_level` up to the current head,
    /// bounded by `max_levels_per_batch`.
    ///
    /// Stops at the first failing level without advancing past it; the next
    /// call starts from that same level again.
    pub async fn catch_up(&self, last_processed_level: &mut u64) -> Result<u32, MonitorError> {
        let head = self.processor.head_level().await?;

        if head <= *last_processed_level {
            return Ok(0);
        }

        let target = head.min(*last_processed_level + self.config.max_levels_per_batch as u64);
        let mut processed = 0;

        for level in (*last_processed_level + 1)..=target {
            if self.shutdown_signal.load(Ordering::Relaxed) {
                info!("Shutdown signal received during block processing");
                break;
            }

            match self.process_level(level).await {
                Ok(inserted) => {
                    info!("Indexed level {} ({} new records)", level, inserted);
                    *last_processed_level = level;
                    processed += 1;
                }
                Err(e) => {
                    error!("Failed to index level {}: {}", level, e);
                    return Err(e);
                }
            }
        }

        if processed > 0 {
            let total_records = self.database.get_record_count().unwrap_or(0);
            MetricsLogger::log_index_status(head, *last_processed_level, total_records);
        }

        Ok(processed)
    }

    /// Extract one level and store it together with the new cursor
    async fn process_level(&self, level: u64) -> Result<usize, MonitorError> {
        let ledger = self.processor.process_block(level).await?;
        let inserted = self.database.store_ledger_at_level(&ledger, level)?;
        Ok(inserted)
    }

    /// Level the monitor resumes after: the stored cursor, else the level
    /// before `start_level`, else the current head.
    pub async fn get_starting_level(&self) -> Result<u64, MonitorError> {
        match self.database.get_last_processed_level() {
            Ok(level) if level > 0 => {
                info!("Resuming after last processed level: {}", level);
                return Ok(level);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Could not read last processed level from database: {}", e);
            }
        }

        if self.config.start_level > 0 {
            info!("No previous state found, starting at configured level {}", self.config.start_level);
            return Ok(self.config.start_level - 1);
        }

        info!("No previous state found, starting from the current head");
        let head = self.processor.head_level().await?;

        if let Err(e) = self.database.set_last_processed_level(head) {
            warn!("Failed to initialize last processed level in database: {}", e);
        }

        Ok(head)
    }

    /// Persist the current cursor
    pub async fn persist_state(&self, last_processed_level: u64) -> Result<(), MonitorError> {
        info!("Persisting state: last processed level = {}", last_processed_level);
        self.database.set_last_processed_level(last_processed_level)?;
        Ok(())
    }

    /// Request graceful shutdown
    pub fn shutdown(&self) {
        info!("Requesting graceful shutdown");
        self.shutdown_signal.store(true, Ordering::Relaxed);
    }

    pub async fn get_status(&self) -> Result<MonitorStatus, MonitorError> {
        let head_level = self.processor.head_level().await?;
        let last_processed_level = self.database.get_last_processed_level()?;
        let total_records = self.database.get_record_count()?;

        MetricsLogger::log_index_status(head_level, last_processed_level, total_records);

        Ok(MonitorStatus {
            head_level,
            last_processed_level,
            levels_behind: head_level.saturating_sub(last_processed_level),
            total_records,
            is_running: !self.shutdown_signal.load(Ordering::Relaxed),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MonitorStatus {
    pub head_level: u64,
    pub last_processed_level: u64,
    pub levels_behind: u64,
    pub total_records: u64,
    pub is_running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Currency, Direction};
    use crate::retry::RetryConfig;
    use crate::tezos::extractor::BlockOperationExtractor;
    use crate::tezos::testing::{block_with_transactions, transaction, InMemoryExplorer};

    const SENDER: &str = "tz1LJchBBMZNAjhJq5qGHNEyzPceRtFuHAqy";
    const RECEIVER: &str = "KT1RKbS3WrVHPpGB88HAzzDXnLsySS7osBvU";

    fn test_config(start_level: u64) -> BlockMonitorConfig {
        BlockMonitorConfig {
            poll_interval_seconds: 1,
            start_level,
            retry_delay_seconds: 0,
            max_levels_per_batch: 10,
        }
    }

    fn monitor(explorer: InMemoryExplorer, database: Database, start_level: u64) -> BlockMonitor<InMemoryExplorer> {
        let processor = BlockProcessor::new(explorer, BlockOperationExtractor::new(Currency::xtz()))
            .with_retry_config(RetryConfig {
                max_attempts: 1,
                initial_delay_seconds: 0,
                max_delay_seconds: 0,
                backoff_multiplier: 1.0,
                jitter: false,
            });
        BlockMonitor::new(processor, database, Some(test_config(start_level)))
    }

    fn chain(levels: std::ops::RangeInclusive<u64>) -> InMemoryExplorer {
        let explorer = InMemoryExplorer::new();
        for level in levels {
            explorer.add_block(block_with_transactions(
                level,
                vec![transaction(&format!("oo{}", level), SENDER, Some(RECEIVER), 1_000_000, "applied")],
            ));
        }
        explorer
    }

    #[test]
    fn test_block_monitor_config_from_processing_config() {
        let processing = ProcessingConfig {
            poll_interval_seconds: 15,
            start_level: 3000001,
            include_internal_operations: true,
            max_levels_per_batch: 20,
            retry_delay_seconds: 3,
        };

        let config = BlockMonitorConfig::from(&processing);
        assert_eq!(config.poll_interval_seconds, 15);
        assert_eq!(config.start_level, 3000001);
        assert_eq!(config.retry_delay_seconds, 3);
        assert_eq!(config.max_levels_per_batch, 20);
    }

    #[tokio::test]
    async fn test_starting_level_prefers_stored_cursor() {
        let database = Database::new_in_memory().unwrap();
        database.set_last_processed_level(3000005).unwrap();

        let monitor = monitor(chain(3000001..=3000010), database, 3000001);
        assert_eq!(monitor.get_starting_level().await.unwrap(), 3000005);
    }

    #[tokio::test]
    async fn test_starting_level_uses_configured_start() {
        let monitor = monitor(chain(3000001..=3000010), Database::new_in_memory().unwrap(), 3000003);
        assert_eq!(monitor.get_starting_level().await.unwrap(), 3000002);
    }

    #[tokio::test]
    async fn test_starting_level_falls_back_to_head() {
        let database = Database::new_in_memory().unwrap();
        let monitor = monitor(chain(3000001..=3000010), database.clone(), 0);

        assert_eq!(monitor.get_starting_level().await.unwrap(), 3000010);
        assert_eq!(database.get_last_processed_level().unwrap(), 3000010);
    }

    #[tokio::test]
    async fn test_catch_up_indexes_levels_in_order() {
        let database = Database::new_in_memory().unwrap();
        let monitor = monitor(chain(3000001..=3000004), database.clone(), 3000001);

        let mut cursor = monitor.get_starting_level().await.unwrap();
        let processed = monitor.catch_up(&mut cursor).await.unwrap();

        assert_eq!(processed, 4);
        assert_eq!(cursor, 3000004);
        assert_eq!(database.get_last_processed_level().unwrap(), 3000004);

        let rows = database.get_address_txs(RECEIVER, Some(Direction::Incoming), 10, 0).unwrap();
        let levels: Vec<u64> = rows.iter().map(|r| r.block_height).collect();
        assert_eq!(levels, vec![3000001, 3000002, 3000003, 3000004]);

        // Nothing new at the head
        assert_eq!(monitor.catch_up(&mut cursor).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_catch_up_respects_batch_size() {
        let database = Database::new_in_memory().unwrap();
        let mut monitor = monitor(chain(3000001..=3000005), database, 3000001);
        monitor.config.max_levels_per_batch = 2;

        let mut cursor = 3000000;
        assert_eq!(monitor.catch_up(&mut cursor).await.unwrap(), 2);
        assert_eq!(cursor, 3000002);
        assert_eq!(monitor.catch_up(&mut cursor).await.unwrap(), 2);
        assert_eq!(monitor.catch_up(&mut cursor).await.unwrap(), 1);
        assert_eq!(cursor, 3000005);
    }

    #[tokio::test]
    async fn test_failed_level_is_not_skipped() {
        let explorer = chain(3000001..=3000003);
        explorer.fail_block(3000002, 1);

        let database = Database::new_in_memory().unwrap();
        let monitor = monitor(explorer, database.clone(), 3000001);

        let mut cursor = 3000000;
        assert!(monitor.catch_up(&mut cursor).await.is_err());
        assert_eq!(cursor, 3000001);
        assert_eq!(database.get_last_processed_level().unwrap(), 3000001);

        // The next pass resumes at the failed level
        assert_eq!(monitor.catch_up(&mut cursor).await.unwrap(), 2);
        assert_eq!(cursor, 3000003);
        assert_eq!(database.get_address_tx_count(SENDER).unwrap(), 3);
    }

    #[tokio::test]
    async fn test_reprocessing_is_idempotent() {
        let database = Database::new_in_memory().unwrap();
        let monitor = monitor(chain(3000001..=3000002), database.clone(), 3000001);

        let mut cursor = 3000000;
        monitor.catch_up(&mut cursor).await.unwrap();
        let mut cursor = 3000000;
        monitor.catch_up(&mut cursor).await.unwrap();

        assert_eq!(database.get_record_count().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_start_stops_on_shutdown_and_persists() {
        let database = Database::new_in_memory().unwrap();
        database.set_last_processed_level(3000007).unwrap();

        let monitor = monitor(chain(3000001..=3000010), database.clone(), 0);
        monitor.shutdown();

        let result = monitor.start().await;
        assert!(matches!(result, Err(MonitorError::Shutdown)));
        assert_eq!(database.get_last_processed_level().unwrap(), 3000007);
    }

    #[tokio::test]
    async fn test_get_status() {
        let database = Database::new_in_memory().unwrap();
        let monitor = monitor(chain(3000001..=3000010), database, 3000001);

        let mut cursor = 3000000;
        monitor.catch_up(&mut cursor).await.unwrap();

        let status = monitor.get_status().await.unwrap();
        assert_eq!(status.head_level, 3000010);
        assert_eq!(status.last_processed_level, 3000010);
        assert_eq!(status.levels_behind, 0);
        assert_eq!(status.total_records, 20);
        assert!(status.is_running);
    }

    #[test]
    fn test_monitor_error_display_and_conversion() {
        let config_error = MonitorError::Config("Test config error".to_string());
        assert_eq!(format!("{}", config_error), "Monitor configuration error: Test config error");

        let ledger: LedgerError = MonitorError::Shutdown.into();
        assert!(matches!(ledger, LedgerError::System(SystemError::Signal(_))));
    }
}
