use rusqlite::{Connection, Result};

/// Current schema version, stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Initialize the database schema with required tables
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    // One row per (address, direction) side of an extracted transfer.
    // `leg` numbers identical records within a block so repeated internal
    // legs survive the uniqueness constraint.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS address_txs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            address TEXT NOT NULL,
            direction TEXT NOT NULL CHECK (direction IN ('incoming', 'outgoing')),
            symbol TEXT NOT NULL,
            tx_hash TEXT NOT NULL,
            value TEXT NOT NULL,
            contract_address TEXT,
            block_height INTEGER NOT NULL,
            leg INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER DEFAULT (strftime('%s', 'now')),
            UNIQUE(address, direction, symbol, tx_hash, block_height, value, leg)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS indexer_state (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            last_processed_level INTEGER NOT NULL DEFAULT 0,
            last_updated INTEGER DEFAULT (strftime('%s', 'now'))
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_address_txs_address ON address_txs(address, direction, block_height)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_address_txs_block ON address_txs(block_height)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_address_txs_hash ON address_txs(tx_hash)",
        [],
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO indexer_state (id, last_processed_level) VALUES (1, 0)",
        [],
    )?;

    Ok(())
}

/// Bring an existing database up to `SCHEMA_VERSION`
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version < SCHEMA_VERSION {
        initialize_schema(conn)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }

    Ok(())
}
