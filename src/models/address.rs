use std::collections::HashSet;
use once_cell::sync::Lazy;

use crate::error::ValidationError;

/// Base58check prefixes of Tezos account and contract addresses
pub const ADDRESS_PREFIXES: &[&str] = &["tz1", "tz2", "tz3", "tz4", "KT1", "sr1"];

/// Encoded length of every supported address kind
pub const ADDRESS_LENGTH: usize = 36;

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

static ADDRESS_PREFIX_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ADDRESS_PREFIXES.iter().copied().collect()
});

/// Address kind derived from the prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// Implicit account (tz1, tz2, tz3, tz4)
    Implicit,
    /// Originated smart contract (KT1)
    Contract,
    /// Smart rollup (sr1)
    Rollup,
}

pub struct AddressValidator;

impl AddressValidator {
    /// Trim surrounding whitespace. Tezos addresses are case-sensitive.
    pub fn normalize(address: &str) -> String {
        address.trim().to_string()
    }

    /// Validate prefix, length and alphabet. Checksums are not verified.
    pub fn validate(address: &str) -> Result<AddressKind, ValidationError> {
        let address = address.trim();

        if address.len() != ADDRESS_LENGTH {
            return Err(ValidationError::InvalidAddress(format!(
                "{} (expected {} characters, got {})",
                address,
                ADDRESS_LENGTH,
                address.len()
            )));
        }

        let prefix = address.get(..3).unwrap_or_default();
        if !ADDRESS_PREFIX_SET.contains(prefix) {
            return Err(ValidationError::InvalidAddress(format!(
                "{} (unknown prefix {})",
                address, prefix
            )));
        }

        if !address.chars().all(|c| BASE58_ALPHABET.contains(c)) {
            return Err(ValidationError::InvalidAddress(format!(
                "{} (contains non-base58 characters)",
                address
            )));
        }

        Ok(Self::kind_of(prefix))
    }

    pub fn is_valid(address: &str) -> bool {
        Self::validate(address).is_ok()
    }

    fn kind_of(prefix: &str) -> AddressKind {
        match prefix {
            "KT1" => AddressKind::Contract,
            "sr1" => AddressKind::Rollup,
            _ => AddressKind::Implicit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_addresses() {
        assert_eq!(
            AddressValidator::validate("tz1LJchBBMZNAjhJq5qGHNEyzPceRtFuHAqy").unwrap(),
            AddressKind::Implicit
        );
        assert_eq!(
            AddressValidator::validate("KT1RKbS3WrVHPpGB88HAzzDXnLsySS7osBvU").unwrap(),
            AddressKind::Contract
        );
        assert!(AddressValidator::is_valid("  tz1iBJuZNNCdzFuGeQreQs81W1NWy9k85Kzi  "));
    }

    #[test]
    fn test_invalid_length() {
        assert!(AddressValidator::validate("tz1LJchBBMZNAjhJq5qGHNEyzPceRtFuHAq").is_err());
        assert!(AddressValidator::validate("").is_err());
    }

    #[test]
    fn test_invalid_prefix() {
        let result = AddressValidator::validate("tz9LJchBBMZNAjhJq5qGHNEyzPceRtFuHAqy");
        assert!(matches!(result, Err(ValidationError::InvalidAddress(msg)) if msg.contains("unknown prefix")));
    }

    #[test]
    fn test_non_base58_characters() {
        // '0' and 'O' are excluded from the base58 alphabet
        assert!(AddressValidator::validate("tz1LJchBBMZNAjhJq5qGHNEyzPceRtFuHA0y").is_err());
        assert!(AddressValidator::validate("tz1LJchBBMZNAjhJq5qGHNEyzPceRtFuHAOy").is_err());
    }

    #[test]
    fn test_normalize_keeps_case() {
        assert_eq!(
            AddressValidator::normalize(" KT1RKbS3WrVHPpGB88HAzzDXnLsySS7osBvU\n"),
            "KT1RKbS3WrVHPpGB88HAzzDXnLsySS7osBvU"
        );
    }
}
