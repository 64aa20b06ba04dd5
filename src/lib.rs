pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod retry;
pub mod tezos;

pub use config::{AppConfig, ApiConfig, CurrencyConfig, DatabaseConfig, ExplorerConfig, LoggingConfig, ProcessingConfig};
pub use error::{LedgerError, Result};
pub use logging::{ErrorLogger, LogContext, MetricsLogger, PerformanceMonitor};
pub use models::{AddressNetFlow, AddressTxRecord, Block, Currency, Direction, ExtractedLedger, TransactionOp};
pub use retry::{RetryConfig, RetryManager, RetryUtils};
pub use tezos::{BlockOperationExtractor, BlockProcessor, ExplorerClient, ExtractorOptions, TzktClient};
