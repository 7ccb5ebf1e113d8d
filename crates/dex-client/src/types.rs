//! Core type definitions for the client.
//!
//! Re-exports from alloy-primitives for Ethereum-compatible types.

use crate::error::DexError;
use alloy::hex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use alloy::primitives::{Address, Bytes, TxHash, U256};

/// Unique identifier for a token (contract address).
pub type TokenId = Address;

/// Amount of tokens in the smallest unit (raw, scaled by `10^decimals`).
pub type Amount = U256;

/// Parse and validate a textual account or contract address.
///
/// Accepts `0x` followed by exactly 40 hex digits in any letter case.
/// Anything else is rejected, surrounding whitespace included. `label`
/// names the input in the error so the caller can tell which argument was
/// malformed.
pub fn validate_address(value: &str, label: &str) -> Result<Address, DexError> {
    let invalid = || DexError::InvalidAddress {
        label: label.to_string(),
        value: value.to_string(),
    };

    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(invalid)?;
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    // Checksums are not enforced; any well-formed hex is accepted.
    let bytes = hex::decode(digits).map_err(|_| invalid())?;
    Ok(Address::from_slice(&bytes))
}

/// Returns the address unless it is the zero address.
pub fn non_zero(address: Option<Address>) -> Option<Address> {
    address.filter(|a| !a.is_zero())
}

/// A known token, as stored in the token registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    /// Token contract address. Unique key of the registry.
    pub address: Address,
    /// Ticker symbol.
    #[serde(default)]
    pub symbol: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Number of fractional digits of the raw amount.
    pub decimals: u8,
}

impl TokenDescriptor {
    pub fn new(
        address: Address,
        symbol: impl Into<String>,
        name: impl Into<String>,
        decimals: u8,
    ) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            name: name.into(),
            decimals,
        }
    }
}

impl fmt::Display for TokenDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @ {}", self.symbol, self.name, self.address)
    }
}

/// A transaction receipt as seen by the client.
#[derive(Debug, Clone)]
pub struct Receipt {
    /// Hash of the mined transaction.
    pub tx_hash: TxHash,
    /// Whether execution succeeded.
    pub success: bool,
    /// Address of the contract created by the transaction, if any.
    pub contract_address: Option<Address>,
    /// Logs emitted during execution.
    pub logs: Vec<alloy::primitives::Log>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_address() {
        let addr = validate_address("0x5FbDB2315678afecb367f032d93F642f64180aa3", "router").unwrap();
        assert_eq!(
            addr,
            "0x5fbdb2315678afecb367f032d93f642f64180aa3"
                .parse::<Address>()
                .unwrap()
        );
        assert!(validate_address("0X5fbdb2315678afecb367f032d93f642f64180aa3", "x").is_ok());
    }

    #[test]
    fn test_validate_address_rejects_malformed() {
        for bad in [
            "",
            "0x",
            "5FbDB2315678afecb367f032d93F642f64180aa3",
            "0x5FbDB2315678afecb367f032d93F642f64180aa",
            "0x5FbDB2315678afecb367f032d93F642f64180aa33",
            "0xZZbDB2315678afecb367f032d93F642f64180aa3",
            " 0x5FbDB2315678afecb367f032d93F642f64180aa3",
            "0x5FbDB2315678afecb367f032d93F642f64180aa3\n",
        ] {
            let err = validate_address(bad, "tokenIn").unwrap_err();
            assert!(matches!(err, DexError::InvalidAddress { .. }), "{bad}");
            assert!(err.to_string().contains("tokenIn"));
        }
    }

    #[test]
    fn test_non_zero() {
        assert_eq!(non_zero(None), None);
        assert_eq!(non_zero(Some(Address::ZERO)), None);
        let a = Address::repeat_byte(0x01);
        assert_eq!(non_zero(Some(a)), Some(a));
    }
}
