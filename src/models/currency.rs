use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

/// Native Tezos currency symbol
pub const XTZ_SYMBOL: &str = "XTZ";

/// Mutez per tez
pub const XTZ_DECIMALS: u32 = 6;

/// A currency and the number of decimal places its smallest unit carries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Currency {
    pub symbol: String,
    pub decimals: u32,
}

impl Currency {
    pub fn new(symbol: &str, decimals: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals,
        }
    }

    pub fn xtz() -> Self {
        Self::new(XTZ_SYMBOL, XTZ_DECIMALS)
    }

    /// Convert an amount in smallest units into human units.
    ///
    /// The result keeps exactly `decimals` fractional digits, so
    /// `49383212121` mutez becomes `49383.212121`.
    pub fn to_human_units(&self, amount: u64) -> Result<Decimal, ExtractionError> {
        Decimal::try_from_i128_with_scale(amount as i128, self.decimals).map_err(|_| {
            ExtractionError::Scale {
                amount,
                decimals: self.decimals,
            }
        })
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::xtz()
    }
}
