//! Millisatoshi amount type
//!
//! Domain primitive for Lightning amounts with business rule validation.
//! All amounts are validated at construction time, ensuring invalid values
//! cannot exist in the system.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Millisatoshis per whole bitcoin (1 BTC = 100,000,000 sats = 10^11 msats)
pub const MSATS_PER_BTC: i64 = 100_000_000_000;

/// Msats represents a validated millisatoshi amount.
///
/// # Invariants
/// - Value is never negative
///
/// # Example
/// ```
/// use satswallet::domain::Msats;
///
/// let amount = Msats::new(50_000).unwrap();
/// assert_eq!(amount.value(), 50_000);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Msats(i64);

/// Errors that can occur when creating or converting an Msats value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MsatsError {
    #[error("Amount must not be negative (got {0})")]
    Negative(i64),

    #[error("Amount exceeds representable range")]
    Overflow,

    #[error("Exchange rate must be positive (got {0})")]
    InvalidRate(Decimal),
}

impl Msats {
    pub const ZERO: Msats = Msats(0);

    /// Create a new Msats value with validation.
    ///
    /// # Errors
    /// - `MsatsError::Negative` if value < 0
    pub fn new(value: i64) -> Result<Self, MsatsError> {
        if value < 0 {
            return Err(MsatsError::Negative(value));
        }
        Ok(Self(value))
    }

    /// Get the underlying millisatoshi value.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Add two amounts, failing on overflow.
    pub fn checked_add(&self, other: Msats) -> Result<Msats, MsatsError> {
        self.0
            .checked_add(other.0)
            .map(Msats)
            .ok_or(MsatsError::Overflow)
    }

    /// Convert a fiat amount to millisatoshis given a fiat-per-BTC rate.
    ///
    /// The fractional msat remainder is truncated.
    ///
    /// # Errors
    /// - `MsatsError::InvalidRate` if rate <= 0
    /// - `MsatsError::Negative` if the fiat amount is negative
    /// - `MsatsError::Overflow` if the result does not fit in i64
    pub fn from_fiat(amount_fiat: Decimal, rate: Decimal) -> Result<Self, MsatsError> {
        if rate <= Decimal::ZERO {
            return Err(MsatsError::InvalidRate(rate));
        }
        if amount_fiat < Decimal::ZERO {
            return Err(MsatsError::Negative(
                amount_fiat.to_i64().unwrap_or(i64::MIN),
            ));
        }

        let btc = amount_fiat / rate;
        let msats = btc
            .checked_mul(Decimal::from(MSATS_PER_BTC))
            .ok_or(MsatsError::Overflow)?
            .trunc();
        msats.to_i64().map(Msats).ok_or(MsatsError::Overflow)
    }

    /// Convert this amount to fiat given a fiat-per-BTC rate.
    pub fn to_fiat(&self, rate: Decimal) -> Decimal {
        Decimal::from(self.0) / Decimal::from(MSATS_PER_BTC) * rate
    }
}

impl fmt::Display for Msats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} msats", self.0)
    }
}

impl TryFrom<i64> for Msats {
    type Error = MsatsError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Msats::new(value)
    }
}

impl From<Msats> for i64 {
    fn from(amount: Msats) -> Self {
        amount.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_msats_non_negative() {
        let amount = Msats::new(1_000);
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().value(), 1_000);
    }

    #[test]
    fn test_msats_zero_allowed() {
        let amount = Msats::new(0);
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap(), Msats::ZERO);
    }

    #[test]
    fn test_msats_negative_rejected() {
        let amount = Msats::new(-1);
        assert!(matches!(amount, Err(MsatsError::Negative(-1))));
    }

    #[test]
    fn test_checked_add() {
        let a = Msats::new(100_000).unwrap();
        let b = Msats::new(2_500).unwrap();
        assert_eq!(a.checked_add(b).unwrap().value(), 102_500);
    }

    #[test]
    fn test_checked_add_overflow() {
        let a = Msats::new(i64::MAX).unwrap();
        let b = Msats::new(1).unwrap();
        assert!(matches!(a.checked_add(b), Err(MsatsError::Overflow)));
    }

    #[test]
    fn test_from_fiat() {
        // 100 fiat units at 5,000,000 per BTC = 2e-5 BTC = 2,000,000 msats
        let amount = Msats::from_fiat(dec!(100), dec!(5000000)).unwrap();
        assert_eq!(amount.value(), 2_000_000);
    }

    #[test]
    fn test_from_fiat_truncates() {
        let amount = Msats::from_fiat(dec!(0.01), dec!(7000000)).unwrap();
        // 0.01 / 7,000,000 BTC = 142.857... msats, truncated
        assert_eq!(amount.value(), 142);
    }

    #[test]
    fn test_from_fiat_zero_rate_rejected() {
        let result = Msats::from_fiat(dec!(100), Decimal::ZERO);
        assert!(matches!(result, Err(MsatsError::InvalidRate(_))));
    }

    #[test]
    fn test_from_fiat_negative_amount_rejected() {
        let result = Msats::from_fiat(dec!(-5), dec!(5000000));
        assert!(matches!(result, Err(MsatsError::Negative(_))));
    }

    #[test]
    fn test_to_fiat_round_trip() {
        let amount = Msats::new(2_000_000).unwrap();
        assert_eq!(amount.to_fiat(dec!(5000000)), dec!(100));
    }
}
