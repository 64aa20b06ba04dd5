use clap::Parser;
use std::sync::Arc;
use tzkt_ledger::api::ApiServer;
use tzkt_ledger::config::AppConfig;
use tzkt_ledger::database::Database;
use tzkt_ledger::logging::init_logging;

#[derive(Parser)]
#[command(name = "tzkt-ledger-server")]
#[command(about = "HTTP API over the stored Tezos address ledger")]
#[command(version)]
struct Args {
    /// Database path (defaults to the configured path)
    #[arg(long)]
    database: Option<String>,

    /// Server port (defaults to the configured port)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    print_server_banner();

    let args = Args::parse();

    let mut config = AppConfig::load()?;
    if let Some(database) = args.database {
        config.database.path = database;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }

    init_logging(&config.logging)?;

    let database = Database::new_with_config(&config.database)
        .map_err(|e| format!("Failed to initialize database: {}", e))?;

    let server = ApiServer::new(Arc::new(database), config.api.clone());

    log::info!("Starting HTTP API server on port {}", server.port());

    if let Err(e) = server.start().await {
        log::error!("Server failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}

fn print_server_banner() {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Tezos Address Ledger API Server              ║");
    println!("║                                                              ║");
    println!("║                 Starting HTTP API server...                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}
