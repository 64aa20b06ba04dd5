//! In-memory explorer and payload builders shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde_json::json;

use crate::error::ExplorerError;
use crate::models::{Block, TransactionOp};
use crate::tezos::explorer_client::ExplorerClient;

#[derive(Default)]
pub struct InMemoryExplorer {
    head: AtomicU64,
    blocks: Mutex<HashMap<u64, Block>>,
    failures: Mutex<HashMap<u64, u32>>,
    requests: Mutex<HashMap<u64, u32>>,
    balances: Mutex<HashMap<String, u64>>,
}

impl InMemoryExplorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block; the head follows the highest level added
    pub fn add_block(&self, block: Block) {
        self.head.fetch_max(block.level, Ordering::SeqCst);
        self.blocks.lock().unwrap().insert(block.level, block);
    }

    pub fn set_head(&self, level: u64) {
        self.head.store(level, Ordering::SeqCst);
    }

    /// Make the next `times` requests for `level` fail with a 503
    pub fn fail_block(&self, level: u64, times: u32) {
        self.failures.lock().unwrap().insert(level, times);
    }

    pub fn set_balance(&self, address: &str, balance: u64) {
        self.balances.lock().unwrap().insert(address.to_string(), balance);
    }

    pub fn block_requests(&self, level: u64) -> u32 {
        self.requests.lock().unwrap().get(&level).copied().unwrap_or(0)
    }
}

impl ExplorerClient for InMemoryExplorer {
    async fn get_head_level(&self) -> Result<u64, ExplorerError> {
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn get_block_txs(&self, level: u64) -> Result<Block, ExplorerError> {
        *self.requests.lock().unwrap().entry(level).or_insert(0) += 1;

        if let Some(remaining) = self.failures.lock().unwrap().get_mut(&level) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ExplorerError::Status {
                    status: 503,
                    url: format!("memory://blocks/{}", level),
                });
            }
        }

        self.blocks
            .lock()
            .unwrap()
            .get(&level)
            .cloned()
            .ok_or(ExplorerError::BlockNotFound { level })
    }

    async fn get_address_txs(&self, address: &str, limit: u32) -> Result<Vec<TransactionOp>, ExplorerError> {
        let blocks = self.blocks.lock().unwrap();
        let mut levels: Vec<&u64> = blocks.keys().collect();
        levels.sort();

        Ok(levels
            .into_iter()
            .flat_map(|level| blocks[level].transactions.iter())
            .filter(|op| op.sender_address() == Some(address) || op.target_address() == Some(address))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_balance(&self, address: &str) -> Result<u64, ExplorerError> {
        Ok(self.balances.lock().unwrap().get(address).copied().unwrap_or(0))
    }
}

pub fn transaction(hash: &str, sender: &str, target: Option<&str>, amount: i64, status: &str) -> TransactionOp {
    let mut op = json!({
        "type": "transaction",
        "hash": hash,
        "sender": { "address": sender },
        "amount": amount,
        "status": status,
        "hasInternals": false,
    });
    if let Some(target) = target {
        op["target"] = json!({ "address": target });
    }
    serde_json::from_value(op).unwrap()
}

pub fn block_with_transactions(level: u64, transactions: Vec<TransactionOp>) -> Block {
    let mut block: Block = serde_json::from_value(json!({
        "level": level,
        "hash": format!("BL{}", level),
        "timestamp": "2022-12-01T00:00:00Z",
    }))
    .unwrap();
    block.transactions = transactions;
    block
}
