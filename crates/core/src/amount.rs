//! Monetary amounts in the smallest currency unit.

use core::str::FromStr;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{FundError, FundResult};

/// Decimal places of one whole ether.
pub const ETHER_DECIMALS: u32 = 18;

/// Non-negative amount in the smallest currency unit (e.g. wei).
///
/// Serialized as a decimal string: JSON numbers cannot carry the full `u128`
/// range without loss.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn new(units: u128) -> Self {
        Self(units)
    }

    pub const fn get(self) -> u128 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    /// Parse a decimal string scaled by `decimals` (`parse_units("0.5", 18)`).
    ///
    /// Rejects signs, exponents, more fractional digits than `decimals` and
    /// anything that overflows `u128`.
    pub fn parse_units(text: &str, decimals: u32) -> FundResult<Self> {
        let text = text.trim();
        let (whole, frac) = text.split_once('.').unwrap_or((text, ""));

        if whole.is_empty() && frac.is_empty() {
            return Err(FundError::invalid_amount(format!("'{text}' has no digits")));
        }
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(frac) {
            return Err(FundError::invalid_amount(format!("'{text}' is not a decimal number")));
        }
        if frac.len() > decimals as usize {
            return Err(FundError::invalid_amount(format!(
                "'{text}' has more than {decimals} decimal places"
            )));
        }

        let overflow = || FundError::invalid_amount(format!("'{text}' overflows"));
        let scale = 10u128.checked_pow(decimals).ok_or_else(overflow)?;

        let whole_units: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let frac_units: u128 = if frac.is_empty() {
            0
        } else {
            // frac.len() <= decimals, so both factors stay below `scale`.
            let digits: u128 = frac.parse().map_err(|_| overflow())?;
            digits * 10u128.pow(decimals - frac.len() as u32)
        };

        whole_units
            .checked_mul(scale)
            .and_then(|w| w.checked_add(frac_units))
            .map(Amount)
            .ok_or_else(overflow)
    }

    /// `Amount::from_ether("0.5")` == 5 * 10^17 wei.
    pub fn from_ether(text: &str) -> FundResult<Self> {
        Self::parse_units(text, ETHER_DECIMALS)
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value as u128)
    }
}

impl From<Amount> for u128 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Amount {
    type Err = FundError;

    /// Parses raw smallest units (no decimal point).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_units(s, 0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("a non-negative integer amount as a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
        Ok(Amount(v))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ether_fractions() {
        assert_eq!(
            Amount::from_ether("0.5").unwrap(),
            Amount::new(500_000_000_000_000_000)
        );
        assert_eq!(
            Amount::from_ether("2").unwrap(),
            Amount::new(2_000_000_000_000_000_000)
        );
        assert_eq!(Amount::from_ether(".2").unwrap(), Amount::from_ether("0.2").unwrap());
    }

    #[test]
    fn rejects_malformed_text() {
        for bad in ["", ".", "-1", "1e18", "0.1.2", "abc"] {
            assert!(
                matches!(Amount::from_ether(bad), Err(FundError::InvalidAmount(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(Amount::parse_units("0.001", 2).is_err());
    }

    #[test]
    fn rejects_overflow() {
        let huge = "9".repeat(40);
        assert!(Amount::from_ether(&huge).is_err());
    }

    #[test]
    fn serializes_as_string_beyond_u64() {
        let amount = Amount::new(u64::MAX as u128 * 10);
        let json = serde_json::to_value(amount).unwrap();
        assert_eq!(json, serde_json::Value::String(amount.to_string()));

        let back: Amount = serde_json::from_value(json).unwrap();
        assert_eq!(back, amount);

        let from_number: Amount = serde_json::from_str("42").unwrap();
        assert_eq!(from_number, Amount::new(42));
    }

    #[test]
    fn checked_arithmetic() {
        let a = Amount::new(3);
        assert_eq!(a.checked_add(Amount::new(2)), Some(Amount::new(5)));
        assert_eq!(a.checked_sub(Amount::new(4)), None);
        assert_eq!(a.saturating_sub(Amount::new(4)), Amount::ZERO);
        assert_eq!(Amount::new(u128::MAX).checked_add(Amount::new(1)), None);
    }
}
