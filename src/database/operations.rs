use rusqlite::{Connection, params};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::config::DatabaseConfig;
use crate::database::schema::{initialize_schema, run_migrations};
use crate::logging::{MetricsLogger, PerformanceMonitor};
use crate::models::{AddressNetFlow, AddressTxRecord, Direction, ExtractedLedger, NetFlowCalculator};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection failed: {0}")]
    Connection(#[from] rusqlite::Error),
    #[error("Database operation failed: {0}")]
    Operation(String),
    #[error("Database lock poisoned: {0}")]
    Lock(String),
    #[error("Record not found")]
    NotFound,
}

/// SQLite store for extracted address records and indexer state
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) a database file and initialize the schema
    pub fn new(db_path: &str) -> Result<Self, DbError> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// Open a database file applying the configured pragmas
    pub fn new_with_config(config: &DatabaseConfig) -> Result<Self, DbError> {
        let conn = Connection::open(&config.path)?;
        conn.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms as u64))?;
        if config.enable_wal_mode {
            let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            log::debug!("SQLite journal mode: {}", mode);
        }
        Self::from_connection(conn)
    }

    /// Create an in-memory database for testing
    pub fn new_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        initialize_schema(&conn)?;
        run_migrations(&conn)?;

        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|e| DbError::Lock(e.to_string()))
    }

    /// Persist every record of an extracted ledger in one SQL transaction.
    ///
    /// Returns the number of newly inserted rows. Records already present are
    /// ignored, so storing the same ledger twice inserts nothing the second time.
    pub fn store_ledger(&self, ledger: &ExtractedLedger) -> Result<usize, DbError> {
        self.store(ledger, None)
    }

    /// Persist a ledger and advance the last processed level atomically
    pub fn store_ledger_at_level(&self, ledger: &ExtractedLedger, level: u64) -> Result<usize, DbError> {
        self.store(ledger, Some(level))
    }

    fn store(&self, ledger: &ExtractedLedger, level: Option<u64>) -> Result<usize, DbError> {
        let monitor = PerformanceMonitor::new("db_store_ledger");
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO address_txs
                    (address, direction, symbol, tx_hash, value, contract_address, block_height, leg)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;

            let mut legs: HashMap<(&str, &str, &str, &str, u64, String), u32> = HashMap::new();
            for (direction, address, record) in ledger.iter() {
                let value = record.value.to_string();
                let counter = legs
                    .entry((
                        direction.as_str(),
                        address,
                        record.symbol.as_str(),
                        record.tx_hash.as_str(),
                        record.block_height,
                        value.clone(),
                    ))
                    .or_insert(0);
                let leg = *counter;
                *counter += 1;

                inserted += stmt.execute(params![
                    address,
                    direction.as_str(),
                    record.symbol,
                    record.tx_hash,
                    value,
                    record.contract_address,
                    record.block_height,
                    leg,
                ])?;
            }
        }

        if let Some(level) = level {
            tx.execute(
                "UPDATE indexer_state SET last_processed_level = ?1, last_updated = strftime('%s', 'now') WHERE id = 1",
                params![level],
            )?;
        }

        tx.commit()?;

        let duration = monitor.finish();
        MetricsLogger::log_database_operation("store_ledger", duration, Some(inserted));
        Ok(inserted)
    }

    /// Stored records for an address, oldest block first
    pub fn get_address_txs(
        &self,
        address: &str,
        direction: Option<Direction>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<AddressTxRow>, DbError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, address, direction, symbol, tx_hash, value, contract_address, block_height, created_at
             FROM address_txs
             WHERE address = ?1 AND (?2 IS NULL OR direction = ?2)
             ORDER BY block_height, id
             LIMIT ?3 OFFSET ?4",
        )?;

        let rows = stmt.query_map(
            params![address, direction.map(|d| d.as_str()), limit, offset],
            |row| {
                Ok(AddressTxRow {
                    id: row.get(0)?,
                    address: row.get(1)?,
                    direction: row.get(2)?,
                    symbol: row.get(3)?,
                    tx_hash: row.get(4)?,
                    value: row.get(5)?,
                    contract_address: row.get(6)?,
                    block_height: row.get(7)?,
                    created_at: row.get(8)?,
                })
            },
        )?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }

        Ok(records)
    }

    /// Number of stored records (both directions) for an address
    pub fn get_address_tx_count(&self, address: &str) -> Result<u64, DbError> {
        self.count_address_txs(address, None)
    }

    /// Number of stored records for an address, optionally for one direction
    pub fn count_address_txs(&self, address: &str, direction: Option<Direction>) -> Result<u64, DbError> {
        let conn = self.lock()?;

        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM address_txs WHERE address = ?1 AND (?2 IS NULL OR direction = ?2)",
            params![address, direction.map(|d| d.as_str())],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// Total number of stored records
    pub fn get_record_count(&self) -> Result<u64, DbError> {
        let conn = self.lock()?;

        let count: u64 = conn.query_row("SELECT COUNT(*) FROM address_txs", [], |row| row.get(0))?;

        Ok(count)
    }

    /// Incoming and outgoing totals of one address bucket.
    ///
    /// Values are summed as decimals in Rust; SQLite's SUM would go through
    /// floating point.
    pub fn get_net_flow(&self, address: &str, symbol: &str) -> Result<AddressNetFlow, DbError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT value FROM address_txs WHERE address = ?1 AND symbol = ?2 AND direction = ?3",
        )?;

        let mut totals = [Decimal::ZERO; 2];
        for (slot, direction) in [Direction::Incoming, Direction::Outgoing].iter().enumerate() {
            let values = stmt
                .query_map(params![address, symbol, direction.as_str()], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<String>, _>>()?;

            totals[slot] = NetFlowCalculator::sum(&values)
                .map_err(|e| DbError::Operation(format!("Failed to sum {} values: {}", direction.as_str(), e)))?;
        }

        Ok(AddressNetFlow::new(address, symbol, totals[0], totals[1]))
    }

    /// Get the last processed block level (0 when nothing was indexed yet)
    pub fn get_last_processed_level(&self) -> Result<u64, DbError> {
        let conn = self.lock()?;

        let level: u64 = conn.query_row(
            "SELECT last_processed_level FROM indexer_state WHERE id = 1",
            [],
            |row| row.get(0),
        )?;

        Ok(level)
    }

    /// Set the last processed block level
    pub fn set_last_processed_level(&self, level: u64) -> Result<(), DbError> {
        let conn = self.lock()?;

        conn.execute(
            "UPDATE indexer_state SET last_processed_level = ?1, last_updated = strftime('%s', 'now') WHERE id = 1",
            params![level],
        )?;

        Ok(())
    }

    /// Full indexer state row
    pub fn get_indexer_state(&self) -> Result<IndexerStateRow, DbError> {
        let conn = self.lock()?;

        let row = conn.query_row(
            "SELECT last_processed_level, last_updated FROM indexer_state WHERE id = 1",
            [],
            |row| {
                Ok(IndexerStateRow {
                    last_processed_level: row.get(0)?,
                    last_updated: row.get(1)?,
                })
            },
        ).map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::NotFound,
            _ => DbError::Connection(e),
        })?;

        Ok(row)
    }
}

/// Represents a row from the address_txs table
#[derive(Debug, Clone, Serialize)]
pub struct AddressTxRow {
    pub id: i64,
    pub address: String,
    pub direction: String,
    pub symbol: String,
    pub tx_hash: String,
    pub value: String,
    pub contract_address: Option<String>,
    pub block_height: u64,
    pub created_at: u64,
}

impl AddressTxRow {
    pub fn direction(&self) -> Result<Direction, DbError> {
        Direction::from_str(&self.direction).map_err(|e| DbError::Operation(e.to_string()))
    }

    /// Convert back to the in-memory record
    pub fn to_record(&self) -> Result<AddressTxRecord, DbError> {
        let value = NetFlowCalculator::parse_decimal(&self.value)
            .map_err(|e| DbError::Operation(e.to_string()))?;

        Ok(AddressTxRecord {
            tx_hash: self.tx_hash.clone(),
            value,
            contract_address: self.contract_address.clone(),
            block_height: self.block_height,
            symbol: self.symbol.clone(),
        })
    }
}

/// Represents the single row of the indexer_state table
#[derive(Debug, Clone, Serialize)]
pub struct IndexerStateRow {
    pub last_processed_level: u64,
    pub last_updated: u64,
}
