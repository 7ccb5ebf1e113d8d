//! Conversion between human-readable decimal amounts and raw token amounts.
//!
//! A raw amount is the integer the contracts operate on: the human value
//! scaled by `10^decimals`. Conversion is exact or fails; fractional digits
//! beyond the token's precision are never truncated.

use crate::error::DexError;
use crate::types::{Amount, U256};

/// Convert a human decimal string (e.g. `"1.5"`) into a raw amount.
pub fn to_raw(human: &str, decimals: u8) -> Result<Amount, DexError> {
    let invalid = |reason: String| DexError::InvalidAmount {
        value: human.to_string(),
        reason,
    };

    let s = human.trim();
    if s.is_empty() {
        return Err(invalid("empty amount".to_string()));
    }
    if s.starts_with('-') {
        return Err(invalid("amount must not be negative".to_string()));
    }

    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid("no digits".to_string()));
    }
    let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(int_part) || !is_digits(frac_part) {
        return Err(invalid("not a decimal number".to_string()));
    }
    if frac_part.len() > decimals as usize {
        return Err(invalid(format!(
            "{} fractional digits exceed token precision of {}",
            frac_part.len(),
            decimals
        )));
    }

    // Shift the decimal point right by `decimals` places, then parse as an integer.
    let mut digits = String::with_capacity(int_part.len() + decimals as usize);
    digits.push_str(int_part);
    digits.push_str(frac_part);
    digits.extend(std::iter::repeat('0').take(decimals as usize - frac_part.len()));

    U256::from_str_radix(&digits, 10).map_err(|_| invalid("amount overflows 256 bits".to_string()))
}

/// Convert a raw amount back to its canonical human decimal string.
///
/// Trailing fractional zeros and a trailing decimal point are dropped, so
/// `1500000` at 6 decimals renders as `"1.5"` and `10^18` at 18 as `"1"`.
pub fn to_human(raw: Amount, decimals: u8) -> String {
    let digits = raw.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');

    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    }
}

/// Parse a user-supplied decimal count (0 to 255).
pub fn parse_decimals(value: &str) -> Result<u8, DexError> {
    value
        .trim()
        .parse::<u8>()
        .map_err(|_| DexError::InvalidDecimals(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_raw() {
        assert_eq!(to_raw("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(to_raw("10", 18).unwrap(), U256::from(10u64) * U256::from(10u64).pow(U256::from(18)));
        assert_eq!(to_raw("0.000001", 6).unwrap(), U256::from(1u64));
        assert_eq!(to_raw(".5", 1).unwrap(), U256::from(5u64));
        assert_eq!(to_raw("5.", 2).unwrap(), U256::from(500u64));
        assert_eq!(to_raw("42", 0).unwrap(), U256::from(42u64));
        assert_eq!(to_raw(" 7 ", 0).unwrap(), U256::from(7u64));
    }

    #[test]
    fn test_to_raw_rejects_invalid() {
        for (value, decimals) in [
            ("", 18),
            (".", 18),
            ("-1", 18),
            ("+1", 18),
            ("abc", 18),
            ("1e18", 18),
            ("1.2.3", 18),
            ("1,5", 18),
            ("1.5", 0),
            ("0.1234567", 6),
        ] {
            assert!(
                matches!(to_raw(value, decimals), Err(DexError::InvalidAmount { .. })),
                "{value:?} at {decimals} decimals should be rejected"
            );
        }
    }

    #[test]
    fn test_to_raw_overflow() {
        let huge = "1".repeat(80);
        assert!(matches!(to_raw(&huge, 0), Err(DexError::InvalidAmount { .. })));
        assert!(matches!(to_raw("1", 255), Err(DexError::InvalidAmount { .. })));
        assert_eq!(to_raw("0", 255).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_to_human() {
        assert_eq!(to_human(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(to_human(U256::from(1u64), 6), "0.000001");
        assert_eq!(to_human(U256::ZERO, 18), "0");
        assert_eq!(to_human(U256::from(42u64), 0), "42");
        assert_eq!(to_human(U256::from(10u64).pow(U256::from(18)), 18), "1");
    }

    #[test]
    fn test_round_trip() {
        for (human, decimals) in [
            ("0", 18),
            ("1", 18),
            ("1.5", 18),
            ("0.000000000000000001", 18),
            ("123456789.123456", 6),
            ("10", 6),
            ("99", 0),
            ("0.1", 1),
        ] {
            let raw = to_raw(human, decimals).unwrap();
            assert_eq!(to_human(raw, decimals), human);
        }
    }

    #[test]
    fn test_parse_decimals() {
        assert_eq!(parse_decimals("18").unwrap(), 18);
        assert_eq!(parse_decimals("0").unwrap(), 0);
        assert_eq!(parse_decimals("255").unwrap(), 255);
        assert!(matches!(parse_decimals("256"), Err(DexError::InvalidDecimals(_))));
        assert!(matches!(parse_decimals("-1"), Err(DexError::InvalidDecimals(_))));
        assert!(matches!(parse_decimals("six"), Err(DexError::InvalidDecimals(_))));
    }
}
