//! Fixed-point token amounts.
//!
//! Amounts are kept as integer base units (lamports, token wei) alongside
//! the token's decimals. Parsing and formatting are exact; no floats.

use std::fmt;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lamports per SOL.
pub const SOL_DECIMALS: u8 = 9;
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// An amount in base units together with its decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub base_units: U256,
    pub decimals: u8,
}

impl TokenAmount {
    pub fn new(base_units: U256, decimals: u8) -> Self {
        Self {
            base_units,
            decimals,
        }
    }

    pub fn from_lamports(lamports: u64) -> Self {
        Self::new(U256::from(lamports), SOL_DECIMALS)
    }

    pub fn is_zero(&self) -> bool {
        self.base_units.is_zero()
    }

    /// Base units as `u64`, or `None` if they do not fit.
    pub fn to_u64(&self) -> Option<u64> {
        if self.base_units > U256::from(u64::MAX) {
            return None;
        }
        Some(self.base_units.as_limbs()[0])
    }
}

impl fmt::Display for TokenAmount {
    /// Full precision: `1000000000` at 9 decimals prints `1.000000000`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.base_units.to_string();
        let decimals = usize::from(self.decimals);
        if decimals == 0 {
            return f.write_str(&digits);
        }

        let padded = format!("{digits:0>width$}", width = decimals + 1);
        let (whole, frac) = padded.split_at(padded.len() - decimals);
        write!(f, "{whole}.{frac}")
    }
}

/// Parse a decimal string such as `"1.5"` into base units.
///
/// Rejects signs, exponents, more fractional digits than `decimals`, and
/// values that overflow 256 bits. Zero parses; callers decide whether
/// zero is acceptable.
pub fn parse_units(input: &str, decimals: u8) -> Result<TokenAmount, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::InvalidAmount("amount is empty".into()));
    }
    if input.starts_with('-') {
        return Err(ValidationError::NonPositiveAmount);
    }

    let (whole, frac) = match input.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (input, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(ValidationError::InvalidAmount(format!("'{input}' is not a number")));
    }

    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(whole) || !is_digits(frac) {
        return Err(ValidationError::InvalidAmount(format!("'{input}' is not a number")));
    }
    if frac.len() > usize::from(decimals) {
        return Err(ValidationError::InvalidAmount(format!(
            "too many decimal places: at most {decimals} allowed"
        )));
    }

    let overflow = || ValidationError::InvalidAmount("amount is too large".into());
    let ten = U256::from(10u8);
    let mut value = U256::ZERO;
    let frac_padded = format!("{frac:0<width$}", width = usize::from(decimals));
    for digit in whole.bytes().chain(frac_padded.bytes()) {
        value = value
            .checked_mul(ten)
            .and_then(|v| v.checked_add(U256::from(digit - b'0')))
            .ok_or_else(overflow)?;
    }

    Ok(TokenAmount::new(value, decimals))
}

/// Parse a SOL amount into lamports.
pub fn parse_sol(input: &str) -> Result<u64, ValidationError> {
    parse_units(input, SOL_DECIMALS)?
        .to_u64()
        .ok_or_else(|| ValidationError::InvalidAmount("amount is too large".into()))
}

/// Format lamports as SOL with full precision.
pub fn format_sol(lamports: u64) -> String {
    TokenAmount::from_lamports(lamports).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_full_precision() {
        assert_eq!(format_sol(LAMPORTS_PER_SOL), "1.000000000");
        assert_eq!(format_sol(1), "0.000000001");
        assert_eq!(format_sol(0), "0.000000000");
        assert_eq!(format_sol(2_500_000_000), "2.500000000");
    }

    #[test]
    fn format_zero_decimals() {
        assert_eq!(TokenAmount::new(U256::from(42u8), 0).to_string(), "42");
    }

    #[test]
    fn parse_whole_and_fraction() {
        assert_eq!(parse_sol("1").unwrap(), LAMPORTS_PER_SOL);
        assert_eq!(parse_sol("1.5").unwrap(), 1_500_000_000);
        assert_eq!(parse_sol("0.000000001").unwrap(), 1);
        assert_eq!(parse_sol(" 2.0 ").unwrap(), 2 * LAMPORTS_PER_SOL);
        assert_eq!(parse_sol(".5").unwrap(), 500_000_000);
        assert_eq!(parse_sol("3.").unwrap(), 3 * LAMPORTS_PER_SOL);
    }

    #[test]
    fn parse_rejects_excess_precision() {
        assert!(matches!(
            parse_sol("0.0000000001"),
            Err(ValidationError::InvalidAmount(_))
        ));
    }

    #[test]
    fn parse_rejects_garbage() {
        for input in ["", " ", ".", "abc", "1e9", "1.2.3", "+1", "1,5"] {
            assert!(parse_sol(input).is_err(), "{input:?} should be rejected");
        }
    }

    #[test]
    fn parse_rejects_negative() {
        assert_eq!(parse_sol("-1"), Err(ValidationError::NonPositiveAmount));
    }

    #[test]
    fn parse_overflow() {
        let huge = "9".repeat(80);
        assert!(parse_units(&huge, 18).is_err());
        // Fits in U256 but not in lamports.
        assert!(parse_sol("100000000000").is_err());
    }

    #[test]
    fn parse_then_format_is_exact() {
        let amount = parse_units("123.456", 9).unwrap();
        assert_eq!(amount.to_string(), "123.456000000");
    }

    #[test]
    fn to_u64_bounds() {
        assert_eq!(TokenAmount::from_lamports(u64::MAX).to_u64(), Some(u64::MAX));
        let big = TokenAmount::new(U256::from(u64::MAX) + U256::from(1u8), 9);
        assert_eq!(big.to_u64(), None);
    }

    #[test]
    fn json_keeps_base_units_and_decimals() {
        let amount = parse_units("2.5", 18).unwrap();
        let json = serde_json::to_value(amount).unwrap();
        assert_eq!(json["decimals"], 18);

        let back: TokenAmount = serde_json::from_value(json).unwrap();
        assert_eq!(back, amount);
        assert_eq!(back.to_string(), "2.500000000000000000");
    }
}
