use clap::{Parser, Subcommand};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::database::{AddressTxRow, Database, DbError};
use crate::error::{LedgerError, ValidationError};
use crate::models::{AddressValidator, Direction, XTZ_SYMBOL};
use crate::tezos::{BlockProcessor, ExplorerClient};

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("{0}")]
    Ledger(#[from] LedgerError),
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "tzkt-ledger-cli")]
#[command(about = "Query the Tezos address ledger and the TzKT explorer")]
#[command(version)]
pub struct Cli {
    /// Database path (defaults to the configured path)
    #[arg(short, long)]
    pub database: Option<String>,

    /// TzKT API endpoint (defaults to the configured endpoint)
    #[arg(short, long)]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Fetch blocks from the explorer and print the extracted ledger
    Extract {
        /// First block level
        #[arg(short, long)]
        level: u64,
        /// Last block level (inclusive, defaults to --level)
        #[arg(short, long)]
        to: Option<u64>,
        /// Also store the extracted records
        #[arg(long)]
        store: bool,
    },
    /// Stored records for an address
    Address {
        address: String,
        /// incoming or outgoing
        #[arg(long)]
        direction: Option<String>,
        #[arg(short, long, default_value = "20")]
        limit: u32,
        #[arg(short, long, default_value = "0")]
        offset: u32,
    },
    /// Stored net flow for an address
    NetFlow {
        address: String,
        #[arg(short, long, default_value = XTZ_SYMBOL)]
        symbol: String,
    },
    /// Recent transactions of an address, fetched live and extracted
    History {
        address: String,
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
    /// Live balance of an address in human units
    Balance { address: String },
    /// Stored record count and last processed level
    Status,
}

#[derive(Debug, Serialize)]
struct AddressOutput {
    address: String,
    total_count: u64,
    transactions: Vec<AddressTxRow>,
}

#[derive(Debug, Serialize)]
struct BalanceOutput {
    address: String,
    symbol: String,
    balance: rust_decimal::Decimal,
}

#[derive(Debug, Serialize)]
struct StatusOutput {
    last_processed_level: u64,
    last_updated: u64,
    total_records: u64,
}

/// Runs CLI commands against the store and an explorer
pub struct CliHandler<C> {
    database: Arc<Database>,
    processor: BlockProcessor<C>,
}

impl<C: ExplorerClient> CliHandler<C> {
    pub fn new(database: Arc<Database>, processor: BlockProcessor<C>) -> Self {
        Self { database, processor }
    }

    /// Execute a command and return its pretty-printed JSON output
    pub async fn execute_command(&self, command: &Commands) -> Result<String, CliError> {
        match command {
            Commands::Extract { level, to, store } => self.extract(*level, to.unwrap_or(*level), *store).await,
            Commands::Address { address, direction, limit, offset } => {
                self.address(address, direction.as_deref(), *limit, *offset)
            }
            Commands::NetFlow { address, symbol } => {
                let address = validated_address(address)?;
                let flow = self.database.get_net_flow(&address, symbol.trim())?;
                Ok(serde_json::to_string_pretty(&flow)?)
            }
            Commands::History { address, limit } => self.history(address, *limit).await,
            Commands::Balance { address } => self.balance(address).await,
            Commands::Status => {
                let state = self.database.get_indexer_state()?;
                let output = StatusOutput {
                    last_processed_level: state.last_processed_level,
                    last_updated: state.last_updated,
                    total_records: self.database.get_record_count()?,
                };
                Ok(serde_json::to_string_pretty(&output)?)
            }
        }
    }

    async fn extract(&self, from: u64, to: u64, store: bool) -> Result<String, CliError> {
        let ledger = self.processor.process_range(from, to).await?;
        if store {
            let inserted = self.database.store_ledger(&ledger)?;
            log::info!("Stored {} new records for levels {}..={}", inserted, from, to);
        }
        Ok(serde_json::to_string_pretty(&ledger)?)
    }

    fn address(&self, address: &str, direction: Option<&str>, limit: u32, offset: u32) -> Result<String, CliError> {
        let address = validated_address(address)?;
        let direction = direction.map(Direction::from_str).transpose()?;
        if limit == 0 {
            return Err(ValidationError::OutOfRange("limit must be greater than 0".to_string()).into());
        }

        let output = AddressOutput {
            total_count: self.database.count_address_txs(&address, direction)?,
            transactions: self.database.get_address_txs(&address, direction, limit, offset)?,
            address,
        };
        Ok(serde_json::to_string_pretty(&output)?)
    }

    async fn history(&self, address: &str, limit: u32) -> Result<String, CliError> {
        let address = validated_address(address)?;
        let ledger = self.processor.process_address(&address, limit).await?;
        Ok(serde_json::to_string_pretty(&ledger)?)
    }

    async fn balance(&self, address: &str) -> Result<String, CliError> {
        let address = validated_address(address)?;
        let output = BalanceOutput {
            balance: self.processor.balance(&address).await?,
            symbol: self.processor.extractor().currency().symbol.clone(),
            address,
        };
        Ok(serde_json::to_string_pretty(&output)?)
    }
}

fn validated_address(raw: &str) -> Result<String, ValidationError> {
    let address = AddressValidator::normalize(raw);
    AddressValidator::validate(&address)?;
    Ok(address)
}
