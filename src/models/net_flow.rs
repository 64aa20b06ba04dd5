use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Incoming/outgoing totals for one address and currency
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddressNetFlow {
    pub address: String,
    pub symbol: String,
    pub total_incoming: Decimal,
    pub total_outgoing: Decimal,
    pub net_flow: Decimal, // Can be negative (incoming - outgoing)
}

impl AddressNetFlow {
    pub fn new(address: &str, symbol: &str, total_incoming: Decimal, total_outgoing: Decimal) -> Self {
        Self {
            address: address.to_string(),
            symbol: symbol.to_string(),
            total_incoming,
            total_outgoing,
            net_flow: total_incoming - total_outgoing,
        }
    }
}

pub struct NetFlowCalculator;

impl NetFlowCalculator {
    /// Sum decimal strings as stored in the database
    pub fn sum(values: &[String]) -> Result<Decimal, CalculationError> {
        values
            .iter()
            .try_fold(Decimal::ZERO, |acc, v| Ok(acc + Self::parse_decimal(v)?))
    }

    /// Calculate net flow (incoming - outgoing)
    pub fn calculate_net(incoming: &str, outgoing: &str) -> Result<Decimal, CalculationError> {
        Ok(Self::parse_decimal(incoming)? - Self::parse_decimal(outgoing)?)
    }

    pub fn parse_decimal(value: &str) -> Result<Decimal, CalculationError> {
        Decimal::from_str(value.trim()).map_err(|_| CalculationError::InvalidDecimal(value.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CalculationError {
    #[error("Invalid decimal format: {0}")]
    InvalidDecimal(String),
}
