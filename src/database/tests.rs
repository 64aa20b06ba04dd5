#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rusqlite::{params, Connection};
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use crate::config::DatabaseConfig;
    use crate::database::{initialize_schema, run_migrations, Database, DbError, SCHEMA_VERSION};
    use crate::models::{AddressTxRecord, Direction, ExtractedLedger};

    const SENDER: &str = "tz1LJchBBMZNAjhJq5qGHNEyzPceRtFuHAqy";
    const RECEIVER: &str = "KT1RKbS3WrVHPpGB88HAzzDXnLsySS7osBvU";

    fn record(tx_hash: &str, value: &str, block_height: u64) -> AddressTxRecord {
        AddressTxRecord {
            tx_hash: tx_hash.to_string(),
            value: Decimal::from_str(value).unwrap(),
            contract_address: None,
            block_height,
            symbol: "XTZ".to_string(),
        }
    }

    fn transfer(ledger: &mut ExtractedLedger, from: &str, to: &str, rec: AddressTxRecord) {
        ledger.push(Direction::Outgoing, from, rec.clone());
        ledger.push(Direction::Incoming, to, rec);
    }

    #[test]
    fn test_database_creation() {
        let db = Database::new_in_memory().expect("Failed to create in-memory database");

        assert_eq!(db.get_record_count().unwrap(), 0);
        assert_eq!(db.get_last_processed_level().unwrap(), 0);

        let state = db.get_indexer_state().unwrap();
        assert_eq!(state.last_processed_level, 0);
    }

    #[test]
    fn test_store_and_retrieve_ledger() {
        let db = Database::new_in_memory().expect("Failed to create database");

        let mut ledger = ExtractedLedger::new();
        transfer(&mut ledger, SENDER, RECEIVER, record("ooFirst", "49383.212121", 3000001));

        let inserted = db.store_ledger(&ledger).expect("Failed to store ledger");
        assert_eq!(inserted, 2);
        assert_eq!(db.get_record_count().unwrap(), 2);

        let outgoing = db.get_address_txs(SENDER, Some(Direction::Outgoing), 10, 0).unwrap();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].tx_hash, "ooFirst");
        assert_eq!(outgoing[0].value, "49383.212121");
        assert_eq!(outgoing[0].block_height, 3000001);
        assert_eq!(outgoing[0].direction().unwrap(), Direction::Outgoing);

        let incoming = db.get_address_txs(RECEIVER, Some(Direction::Incoming), 10, 0).unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].to_record().unwrap(), record("ooFirst", "49383.212121", 3000001));

        // The sender never received anything
        assert!(db.get_address_txs(SENDER, Some(Direction::Incoming), 10, 0).unwrap().is_empty());
    }

    #[test]
    fn test_store_ledger_is_idempotent() {
        let db = Database::new_in_memory().expect("Failed to create database");

        let mut ledger = ExtractedLedger::new();
        transfer(&mut ledger, SENDER, RECEIVER, record("ooFirst", "1.5", 3000001));
        transfer(&mut ledger, SENDER, RECEIVER, record("ooSecond", "2", 3000002));

        assert_eq!(db.store_ledger(&ledger).unwrap(), 4);
        assert_eq!(db.store_ledger(&ledger).unwrap(), 0);
        assert_eq!(db.get_record_count().unwrap(), 4);
    }

    #[test]
    fn test_repeated_identical_legs_are_kept() {
        let db = Database::new_in_memory().expect("Failed to create database");

        // Two internal legs of one operation group moving the same amount
        let mut ledger = ExtractedLedger::new();
        transfer(&mut ledger, RECEIVER, SENDER, record("ooBatch", "0.5", 3000001));
        transfer(&mut ledger, RECEIVER, SENDER, record("ooBatch", "0.5", 3000001));

        assert_eq!(db.store_ledger(&ledger).unwrap(), 4);
        assert_eq!(db.store_ledger(&ledger).unwrap(), 0);
        assert_eq!(db.get_address_tx_count(SENDER).unwrap(), 2);

        let flow = db.get_net_flow(SENDER, "XTZ").unwrap();
        assert_eq!(flow.total_incoming, Decimal::from_str("1.0").unwrap());
    }

    #[test]
    fn test_get_address_txs_ordering_and_pagination() {
        let db = Database::new_in_memory().expect("Failed to create database");

        let mut later = ExtractedLedger::new();
        transfer(&mut later, SENDER, RECEIVER, record("ooLater", "3", 3000005));
        db.store_ledger(&later).unwrap();

        let mut earlier = ExtractedLedger::new();
        transfer(&mut earlier, SENDER, RECEIVER, record("ooEarly", "1", 3000001));
        transfer(&mut earlier, SENDER, RECEIVER, record("ooMiddle", "2", 3000003));
        db.store_ledger(&earlier).unwrap();

        let all = db.get_address_txs(SENDER, None, 10, 0).unwrap();
        let hashes: Vec<&str> = all.iter().map(|r| r.tx_hash.as_str()).collect();
        assert_eq!(hashes, vec!["ooEarly", "ooMiddle", "ooLater"]);

        let page = db.get_address_txs(SENDER, None, 1, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].tx_hash, "ooMiddle");

        assert!(db.get_address_txs(SENDER, None, 10, 5).unwrap().is_empty());
    }

    #[test]
    fn test_address_tx_count() {
        let db = Database::new_in_memory().expect("Failed to create database");

        let mut ledger = ExtractedLedger::new();
        transfer(&mut ledger, SENDER, RECEIVER, record("ooA", "1", 3000001));
        transfer(&mut ledger, RECEIVER, SENDER, record("ooB", "2", 3000002));
        db.store_ledger(&ledger).unwrap();

        assert_eq!(db.get_address_tx_count(SENDER).unwrap(), 2);
        assert_eq!(db.get_address_tx_count(RECEIVER).unwrap(), 2);
        assert_eq!(db.get_address_tx_count("tz1iBJuZNNCdzFuGeQreQs81W1NWy9k85Kzi").unwrap(), 0);
    }

    #[test]
    fn test_net_flow_uses_exact_decimals() {
        let db = Database::new_in_memory().expect("Failed to create database");

        let mut ledger = ExtractedLedger::new();
        transfer(&mut ledger, SENDER, RECEIVER, record("ooA", "0.1", 3000001));
        transfer(&mut ledger, SENDER, RECEIVER, record("ooB", "0.2", 3000002));
        transfer(&mut ledger, RECEIVER, SENDER, record("ooC", "0.05", 3000003));
        db.store_ledger(&ledger).unwrap();

        let flow = db.get_net_flow(SENDER, "XTZ").unwrap();
        assert_eq!(flow.total_incoming, Decimal::from_str("0.05").unwrap());
        assert_eq!(flow.total_outgoing, Decimal::from_str("0.3").unwrap());
        assert_eq!(flow.net_flow, Decimal::from_str("-0.25").unwrap());

        // Stored values reconcile with the in-memory ledger
        assert_eq!(flow.net_flow, ledger.net_flow(SENDER, "XTZ").net_flow);

        let unknown_symbol = db.get_net_flow(SENDER, "tzBTC").unwrap();
        assert_eq!(unknown_symbol.net_flow, Decimal::ZERO);
    }

    #[test]
    fn test_last_processed_level() {
        let db = Database::new_in_memory().expect("Failed to create database");

        db.set_last_processed_level(3000001).unwrap();
        assert_eq!(db.get_last_processed_level().unwrap(), 3000001);

        db.set_last_processed_level(3000002).unwrap();
        assert_eq!(db.get_indexer_state().unwrap().last_processed_level, 3000002);
    }

    #[test]
    fn test_store_ledger_at_level_advances_state() {
        let db = Database::new_in_memory().expect("Failed to create database");

        let mut ledger = ExtractedLedger::new();
        transfer(&mut ledger, SENDER, RECEIVER, record("ooA", "1", 3000007));

        assert_eq!(db.store_ledger_at_level(&ledger, 3000007).unwrap(), 2);
        assert_eq!(db.get_last_processed_level().unwrap(), 3000007);

        // An empty block still moves the cursor
        assert_eq!(db.store_ledger_at_level(&ExtractedLedger::new(), 3000008).unwrap(), 0);
        assert_eq!(db.get_last_processed_level().unwrap(), 3000008);
    }

    #[test]
    fn test_invalid_direction_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO address_txs (address, direction, symbol, tx_hash, value, block_height)
             VALUES (?1, 'sideways', 'XTZ', 'ooX', '1', 1)",
            params![SENDER],
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_migrations_set_schema_version() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0)).unwrap();
        assert_eq!(version, SCHEMA_VERSION);

        // Running again is a no-op
        run_migrations(&conn).unwrap();
    }

    #[test]
    fn test_file_database_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("ledger.db").to_string_lossy().to_string(),
            ..DatabaseConfig::default()
        };

        {
            let db = Database::new_with_config(&config).expect("Failed to open database");
            let mut ledger = ExtractedLedger::new();
            transfer(&mut ledger, SENDER, RECEIVER, record("ooA", "845.005173", 3000002));
            db.store_ledger_at_level(&ledger, 3000002).unwrap();
        }

        let reopened = Database::new(&config.path).expect("Failed to reopen database");
        assert_eq!(reopened.get_record_count().unwrap(), 2);
        assert_eq!(reopened.get_last_processed_level().unwrap(), 3000002);
    }

    #[test]
    fn test_corrupt_value_surfaces_as_operation_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");
        let path = path.to_str().unwrap();

        let db = Database::new(path).unwrap();
        {
            let conn = Connection::open(path).unwrap();
            conn.execute(
                "INSERT INTO address_txs (address, direction, symbol, tx_hash, value, block_height)
                 VALUES (?1, 'incoming', 'XTZ', 'ooBad', 'not-a-number', 1)",
                params![SENDER],
            ).unwrap();
        }

        let result = db.get_net_flow(SENDER, "XTZ");
        assert!(matches!(result, Err(DbError::Operation(_))));
    }
}
