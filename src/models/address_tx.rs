use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::net_flow::AddressNetFlow;

/// One value transfer as seen from a single address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddressTxRecord {
    pub tx_hash: String,
    pub value: Decimal,
    pub contract_address: Option<String>,
    pub block_height: u64,
    pub symbol: String,
}

/// Address -> currency symbol -> records, in extraction order
pub type AddressLedger = BTreeMap<String, BTreeMap<String, Vec<AddressTxRecord>>>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "incoming" | "in" => Ok(Direction::Incoming),
            "outgoing" | "out" => Ok(Direction::Outgoing),
            other => Err(crate::error::ValidationError::InvalidDirection(other.to_string())),
        }
    }
}

/// Outgoing transfers keyed by sender and incoming transfers keyed by receiver
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractedLedger {
    pub outgoing: AddressLedger,
    pub incoming: AddressLedger,
}

impl ExtractedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, direction: Direction, address: &str, record: AddressTxRecord) {
        let ledger = match direction {
            Direction::Incoming => &mut self.incoming,
            Direction::Outgoing => &mut self.outgoing,
        };
        ledger
            .entry(address.to_string())
            .or_default()
            .entry(record.symbol.clone())
            .or_default()
            .push(record);
    }

    pub fn records(&self, direction: Direction, address: &str, symbol: &str) -> &[AddressTxRecord] {
        let ledger = match direction {
            Direction::Incoming => &self.incoming,
            Direction::Outgoing => &self.outgoing,
        };
        ledger
            .get(address)
            .and_then(|by_symbol| by_symbol.get(symbol))
            .map(|records| records.as_slice())
            .unwrap_or(&[])
    }

    /// Total number of records on both sides
    pub fn record_count(&self) -> usize {
        count(&self.outgoing) + count(&self.incoming)
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Append another ledger, keeping per-bucket order
    pub fn merge(&mut self, other: ExtractedLedger) {
        for (direction, ledger) in [(Direction::Outgoing, other.outgoing), (Direction::Incoming, other.incoming)] {
            for (address, by_symbol) in ledger {
                for (_, records) in by_symbol {
                    for record in records {
                        self.push(direction, &address, record);
                    }
                }
            }
        }
    }

    /// Iterate every record as `(direction, address, record)`
    pub fn iter(&self) -> impl Iterator<Item = (Direction, &str, &AddressTxRecord)> {
        flatten(Direction::Outgoing, &self.outgoing).chain(flatten(Direction::Incoming, &self.incoming))
    }

    /// Net flow (incoming minus outgoing) of one address bucket
    pub fn net_flow(&self, address: &str, symbol: &str) -> AddressNetFlow {
        let total_incoming: Decimal = self
            .records(Direction::Incoming, address, symbol)
            .iter()
            .map(|r| r.value)
            .sum();
        let total_outgoing: Decimal = self
            .records(Direction::Outgoing, address, symbol)
            .iter()
            .map(|r| r.value)
            .sum();

        AddressNetFlow::new(address, symbol, total_incoming, total_outgoing)
    }
}

fn count(ledger: &AddressLedger) -> usize {
    ledger
        .values()
        .flat_map(|by_symbol| by_symbol.values())
        .map(|records| records.len())
        .sum()
}

fn flatten(
    direction: Direction,
    ledger: &AddressLedger,
) -> impl Iterator<Item = (Direction, &str, &AddressTxRecord)> {
    ledger.iter().flat_map(move |(address, by_symbol)| {
        by_symbol
            .values()
            .flat_map(|records| records.iter())
            .map(move |record| (direction, address.as_str(), record))
    })
}
