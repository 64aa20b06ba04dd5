pub mod block_monitor;
pub mod block_processor;
pub mod explorer_client;
pub mod extractor;

#[cfg(test)]
pub(crate) mod testing;

pub use block_monitor::{BlockMonitor, BlockMonitorConfig, MonitorError, MonitorStatus};
pub use block_processor::BlockProcessor;
pub use explorer_client::{ExplorerClient, TzktClient};
pub use extractor::{parse_blocks, BlockOperationExtractor, ExtractorOptions};
