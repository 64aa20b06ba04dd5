use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A block as returned by `GET /v1/blocks/{level}?operations=true`.
///
/// Only `transactions` is flattened into the ledger. The remaining operation
/// kinds are kept as raw JSON so a payload round-trips without loss.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub level: u64,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub transactions: Vec<TransactionOp>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub endorsements: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub preendorsements: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub originations: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub delegations: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub reveals: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub migrations: Vec<Value>,
}

/// An operation array sent as `null` is the same as an absent one
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// One entry of a block's `transactions` array.
///
/// Internal legs of an operation group are listed as siblings sharing the
/// same `hash`; they carry an `initiator`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOp {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub level: Option<u64>,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub sender: Option<Party>,
    #[serde(default)]
    pub target: Option<Party>,
    #[serde(default)]
    pub initiator: Option<Party>,
    #[serde(default)]
    pub amount: Option<RawAmount>,
    #[serde(default)]
    pub status: Option<OperationStatus>,
    #[serde(default)]
    pub has_internals: bool,
}

impl TransactionOp {
    pub fn sender_address(&self) -> Option<&str> {
        self.sender.as_ref().and_then(|p| p.address.as_deref())
    }

    pub fn target_address(&self) -> Option<&str> {
        self.target.as_ref().and_then(|p| p.address.as_deref())
    }

    pub fn is_applied(&self) -> bool {
        self.status == Some(OperationStatus::Applied)
    }

    pub fn is_internal(&self) -> bool {
        self.initiator.is_some()
    }
}

/// Sender, target or initiator of an operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Party {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Applied,
    Failed,
    Backtracked,
    Skipped,
    #[serde(other)]
    Unknown,
}

/// Operation amount as found on the wire.
///
/// TzKT sends integers, but the value is validated during extraction rather
/// than at parse time so that a bad amount on a failed operation does not
/// reject the whole block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawAmount {
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for RawAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawAmount::Integer(v) => write!(f, "{}", v),
            RawAmount::Unsigned(v) => write!(f, "{}", v),
            RawAmount::Float(v) => write!(f, "{}", v),
            RawAmount::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Response of `GET /v1/head`
#[derive(Debug, Clone, Deserialize)]
pub struct Head {
    pub level: u64,
    #[serde(default)]
    pub hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_without_transactions_parses_as_empty() {
        let block: Block = serde_json::from_value(json!({
            "level": 3000001,
            "hash": "BLockHash",
            "endorsements": [{"type": "endorsement"}]
        }))
        .expect("Failed to parse block");

        assert_eq!(block.level, 3000001);
        assert!(block.transactions.is_empty());
        assert_eq!(block.endorsements.len(), 1);
    }

    #[test]
    fn test_null_operation_arrays_parse_as_empty() {
        let block: Block = serde_json::from_value(json!({
            "level": 3000001,
            "transactions": null,
            "endorsements": null,
            "preendorsements": null,
            "originations": null,
            "delegations": null,
            "reveals": null,
            "migrations": null
        }))
        .expect("Failed to parse block with null arrays");

        assert!(block.transactions.is_empty());
        assert!(block.endorsements.is_empty());
        assert!(block.migrations.is_empty());
    }

    #[test]
    fn test_transaction_op_fields() {
        let op: TransactionOp = serde_json::from_value(json!({
            "type": "transaction",
            "id": 422557394173952u64,
            "level": 3000002,
            "hash": "opHash",
            "sender": {"alias": "Kucoin", "address": "tz1iBJuZNNCdzFuGeQreQs81W1NWy9k85Kzi"},
            "target": {"address": "tz1Q7RpsRvbozbY5zuhv5AaXuoqeXrcFAtgF"},
            "amount": 845005173,
            "status": "applied",
            "hasInternals": false
        }))
        .expect("Failed to parse operation");

        assert_eq!(op.kind.as_deref(), Some("transaction"));
        assert_eq!(op.sender_address(), Some("tz1iBJuZNNCdzFuGeQreQs81W1NWy9k85Kzi"));
        assert_eq!(op.target_address(), Some("tz1Q7RpsRvbozbY5zuhv5AaXuoqeXrcFAtgF"));
        assert_eq!(op.amount, Some(RawAmount::Integer(845005173)));
        assert!(op.is_applied());
        assert!(!op.is_internal());
        assert!(!op.has_internals);
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let op: TransactionOp = serde_json::from_value(json!({
            "hash": "op",
            "status": "pending"
        }))
        .expect("Failed to parse operation");

        assert_eq!(op.status, Some(OperationStatus::Unknown));
        assert!(!op.is_applied());
    }

    #[test]
    fn test_raw_amount_variants() {
        let int: RawAmount = serde_json::from_value(json!(100)).unwrap();
        assert_eq!(int, RawAmount::Integer(100));

        let text: RawAmount = serde_json::from_value(json!("100")).unwrap();
        assert_eq!(text, RawAmount::Text("100".to_string()));

        let big: RawAmount = serde_json::from_value(json!(u64::MAX)).unwrap();
        assert_eq!(big, RawAmount::Unsigned(u64::MAX));

        let float: RawAmount = serde_json::from_value(json!(1.5)).unwrap();
        assert_eq!(float, RawAmount::Float(1.5));
        assert_eq!(float.to_string(), "1.5");
    }

    #[test]
    fn test_internal_leg_detection() {
        let op: TransactionOp = serde_json::from_value(json!({
            "hash": "op",
            "initiator": {"address": "tz1LJchBBMZNAjhJq5qGHNEyzPceRtFuHAqy"},
            "sender": {"address": "KT1RKbS3WrVHPpGB88HAzzDXnLsySS7osBvU"}
        }))
        .unwrap();

        assert!(op.is_internal());
        assert_eq!(op.target_address(), None);
    }
}
