use clap::Parser;
use std::sync::Arc;
use tzkt_ledger::api::{Cli, CliHandler};
use tzkt_ledger::config::AppConfig;
use tzkt_ledger::database::Database;
use tzkt_ledger::tezos::BlockProcessor;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Less verbose than the indexer
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    print_banner();

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_default();
    if let Some(database) = &cli.database {
        config.database.path = database.clone();
    }
    if let Some(endpoint) = &cli.endpoint {
        config.explorer.endpoint = endpoint.clone();
    }

    let database = match Database::new_with_config(&config.database) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            eprintln!("Failed to open database at '{}': {}", config.database.path, e);
            std::process::exit(1);
        }
    };

    let processor = BlockProcessor::from_config(&config)?;
    let handler = CliHandler::new(database, processor);

    match handler.execute_command(&cli.command).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_banner() {
    eprintln!("╔══════════════════════════════════════════════════════════════╗");
    eprintln!("║                    Tezos Address Ledger CLI                  ║");
    eprintln!("╚══════════════════════════════════════════════════════════════╝");
    eprintln!();
}
