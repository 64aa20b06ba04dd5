use log::{error, info};
use tzkt_ledger::config::AppConfig;
use tzkt_ledger::database::Database;
use tzkt_ledger::logging::init_logging;
use tzkt_ledger::tezos::{BlockMonitor, BlockMonitorConfig, BlockProcessor, MonitorError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    print_banner();

    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting TzKT ledger indexer against {}", config.explorer.endpoint);

    let database = Database::new_with_config(&config.database)?;
    let processor = BlockProcessor::from_config(&config)?;
    let monitor = BlockMonitor::new(
        processor,
        database,
        Some(BlockMonitorConfig::from(&config.processing)),
    );

    match monitor.start().await {
        Ok(()) | Err(MonitorError::Shutdown) => {
            info!("Indexer stopped");
            Ok(())
        }
        Err(e) => {
            error!("Indexer failed: {}", e);
            Err(e.into())
        }
    }
}

fn print_banner() {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Tezos Address Ledger Indexer                ║");
    println!("║                                                              ║");
    println!("║        Per-address transfer history from TzKT blocks         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}
