use log::{debug, trace};
use serde_json::Value;

use crate::error::ExtractionError;
use crate::models::{
    AddressTxRecord, Block, Currency, Direction, ExtractedLedger, RawAmount, TransactionOp,
};

/// Knobs for what the extractor flattens into the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorOptions {
    /// Flatten internal legs (entries carrying an `initiator`) as well as
    /// top-level transactions
    pub include_internal: bool,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self { include_internal: true }
    }
}

/// Flattens TzKT blocks into per-address outgoing and incoming transfer lists.
///
/// Only the `transactions` array of a block is walked. An operation yields a
/// record when it is applied and moves a non-zero amount; the record is
/// appended to the sender's outgoing bucket and, when a target address is
/// present, to the target's incoming bucket.
pub struct BlockOperationExtractor {
    currency: Currency,
    options: ExtractorOptions,
}

impl BlockOperationExtractor {
    pub fn new(currency: Currency) -> Self {
        Self::with_options(currency, ExtractorOptions::default())
    }

    pub fn with_options(currency: Currency, options: ExtractorOptions) -> Self {
        Self { currency, options }
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn options(&self) -> &ExtractorOptions {
        &self.options
    }

    /// Extract the ledger for an ordered list of blocks
    pub fn extract(&self, blocks: &[Block]) -> Result<ExtractedLedger, ExtractionError> {
        let mut ledger = ExtractedLedger::new();
        for block in blocks {
            let produced = self.extract_block_into(block, &mut ledger)?;
            debug!(
                "Block {} ({} transactions) produced {} ledger records",
                block.level,
                block.transactions.len(),
                produced
            );
        }
        Ok(ledger)
    }

    /// Extract a single block, appending to an existing ledger.
    ///
    /// Returns the number of records appended. On error the ledger may hold
    /// records from operations preceding the bad one.
    pub fn extract_block_into(&self, block: &Block, ledger: &mut ExtractedLedger) -> Result<usize, ExtractionError> {
        self.extract_into(&block.transactions, Some(block.level), ledger)
    }

    /// Extract a flat operation list, e.g. the result of an address lookup
    pub fn extract_operations(
        &self,
        operations: &[TransactionOp],
        fallback_level: Option<u64>,
    ) -> Result<ExtractedLedger, ExtractionError> {
        let mut ledger = ExtractedLedger::new();
        self.extract_into(operations, fallback_level, &mut ledger)?;
        Ok(ledger)
    }

    fn extract_into(
        &self,
        operations: &[TransactionOp],
        fallback_level: Option<u64>,
        ledger: &mut ExtractedLedger,
    ) -> Result<usize, ExtractionError> {
        let mut produced = 0;

        for op in operations {
            let record = match self.record_for(op, fallback_level)? {
                Some(record) => record,
                None => continue,
            };

            if let Some(sender) = op.sender_address() {
                ledger.push(Direction::Outgoing, sender, record.clone());
                produced += 1;
            }
            if let Some(target) = op.target_address() {
                ledger.push(Direction::Incoming, target, record);
                produced += 1;
            }
        }

        Ok(produced)
    }

    /// Build the record an operation contributes, or `None` when it moves no value
    fn record_for(
        &self,
        op: &TransactionOp,
        fallback_level: Option<u64>,
    ) -> Result<Option<AddressTxRecord>, ExtractionError> {
        if !op.is_applied() {
            trace!("Skipping operation {} with status {:?}", op.hash, op.status);
            return Ok(None);
        }

        if op.is_internal() && !self.options.include_internal {
            trace!("Skipping internal operation {}", op.hash);
            return Ok(None);
        }

        let amount = match parse_amount(op)? {
            Some(amount) => amount,
            None => return Ok(None),
        };

        // The operation's own level wins over the enclosing block's
        let block_height = op.level.or(fallback_level).ok_or_else(|| {
            ExtractionError::MalformedPayload(format!("operation {} has no level", op.hash))
        })?;

        Ok(Some(AddressTxRecord {
            tx_hash: op.hash.clone(),
            value: self.currency.to_human_units(amount)?,
            contract_address: None,
            block_height,
            symbol: self.currency.symbol.clone(),
        }))
    }
}

/// Parse the amount of an operation in smallest units.
///
/// Absent and zero amounts yield `None`. Negative, fractional and
/// non-numeric amounts are errors.
fn parse_amount(op: &TransactionOp) -> Result<Option<u64>, ExtractionError> {
    let raw = match &op.amount {
        Some(raw) => raw,
        None => return Ok(None),
    };

    let amount = match raw {
        RawAmount::Integer(value) if *value < 0 => {
            return Err(ExtractionError::NegativeAmount {
                tx_hash: op.hash.clone(),
                value: *value,
            });
        }
        RawAmount::Integer(value) => *value as u64,
        RawAmount::Unsigned(value) => *value,
        RawAmount::Text(text) => parse_amount_text(&op.hash, text)?,
        RawAmount::Float(_) => {
            return Err(ExtractionError::InvalidAmount {
                tx_hash: op.hash.clone(),
                value: raw.to_string(),
            });
        }
    };

    Ok(if amount == 0 { None } else { Some(amount) })
}

fn parse_amount_text(tx_hash: &str, text: &str) -> Result<u64, ExtractionError> {
    let trimmed = text.trim();
    if let Ok(amount) = trimmed.parse::<u64>() {
        return Ok(amount);
    }
    match trimmed.parse::<i64>() {
        Ok(value) => Err(ExtractionError::NegativeAmount {
            tx_hash: tx_hash.to_string(),
            value,
        }),
        Err(_) => Err(ExtractionError::InvalidAmount {
            tx_hash: tx_hash.to_string(),
            value: text.to_string(),
        }),
    }
}

/// Parse an explorer payload holding one block object or an array of them
pub fn parse_blocks(payload: Value) -> Result<Vec<Block>, ExtractionError> {
    match payload {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| parse_block(item, index))
            .collect(),
        Value::Object(_) => Ok(vec![parse_block(payload, 0)?]),
        other => Err(ExtractionError::MalformedPayload(format!(
            "expected a block or a list of blocks, got {}",
            json_type(&other)
        ))),
    }
}

fn parse_block(item: Value, index: usize) -> Result<Block, ExtractionError> {
    if !item.is_object() {
        return Err(ExtractionError::MalformedPayload(format!(
            "element {} is a {}, not a block object",
            index,
            json_type(&item)
        )));
    }
    serde_json::from_value(item)
        .map_err(|e| ExtractionError::MalformedPayload(format!("element {}: {}", index, e)))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
