//! USDC amounts with precise decimal arithmetic
//!
//! Claims are denominated and settled in USDC. Amounts are carried as
//! `rust_decimal::Decimal` and converted to the token's integer base units
//! only at the chain boundary.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of decimal places of the USDC token
pub const USDC_DECIMALS: u32 = 6;

/// Largest storable amount, 99_999_999_999_999.999999 (`NUMERIC(20, 6)`)
pub const MAX_USDC_AMOUNT: Decimal = Decimal::from_parts(0x630F_FFFF, 0x6BC7_5E2D, 0x5, false, USDC_DECIMALS);

/// Errors that can occur during amount operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount must be positive")]
    NotPositive,

    #[error("Amount has more than {USDC_DECIMALS} decimal places")]
    TooPrecise,

    #[error("Amount exceeds the maximum of {MAX_USDC_AMOUNT}")]
    TooLarge,

    #[error("Overflow during calculation")]
    Overflow,
}

/// A non-negative USDC amount
///
/// The scale is limited to [`USDC_DECIMALS`] so every value maps exactly onto
/// the token's base units, and the value to [`MAX_USDC_AMOUNT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct UsdcAmount(Decimal);

impl UsdcAmount {
    /// Creates a new amount, rejecting negatives, sub-base-unit precision and
    /// anything above [`MAX_USDC_AMOUNT`]
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::InvalidAmount(amount.to_string()));
        }
        let normalized = amount.normalize();
        if normalized.scale() > USDC_DECIMALS {
            return Err(MoneyError::TooPrecise);
        }
        if normalized > MAX_USDC_AMOUNT {
            return Err(MoneyError::TooLarge);
        }
        Ok(Self(normalized))
    }

    /// Creates a strictly positive amount (used for claim requests)
    pub fn positive(amount: Decimal) -> Result<Self, MoneyError> {
        let value = Self::new(amount)?;
        if value.is_zero() {
            return Err(MoneyError::NotPositive);
        }
        Ok(value)
    }

    /// Zero USDC
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Creates an amount from integer base units (1 USDC = 1_000_000 units)
    pub fn from_base_units(units: u128) -> Result<Self, MoneyError> {
        let units = i128::try_from(units).map_err(|_| MoneyError::Overflow)?;
        let value = Decimal::try_from_i128_with_scale(units, USDC_DECIMALS)
            .map_err(|_| MoneyError::Overflow)?;
        Ok(Self(value.normalize()))
    }

    /// Converts to integer base units for on-chain transfers
    pub fn to_base_units(&self) -> Result<u128, MoneyError> {
        let scaled = self
            .0
            .checked_mul(Decimal::from(10u64.pow(USDC_DECIMALS)))
            .ok_or(MoneyError::Overflow)?;
        scaled.trunc().to_u128().ok_or(MoneyError::Overflow)
    }

    /// Returns the decimal value
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition
    pub fn checked_add(&self, other: &UsdcAmount) -> Result<UsdcAmount, MoneyError> {
        let sum = self.0.checked_add(other.0).ok_or(MoneyError::Overflow)?;
        Self::new(sum)
    }
}

impl TryFrom<Decimal> for UsdcAmount {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UsdcAmount> for Decimal {
    fn from(value: UsdcAmount) -> Decimal {
        value.0
    }
}

impl FromStr for UsdcAmount {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|_| MoneyError::InvalidAmount(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for UsdcAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} USDC", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_base_unit_conversion() {
        let amount = UsdcAmount::new(dec!(12.345678)).unwrap();
        assert_eq!(amount.to_base_units().unwrap(), 12_345_678);

        let back = UsdcAmount::from_base_units(12_345_678).unwrap();
        assert_eq!(back, amount);
    }

    #[test]
    fn test_rejects_excess_precision() {
        assert_eq!(UsdcAmount::new(dec!(1.0000001)), Err(MoneyError::TooPrecise));
    }

    #[test]
    fn test_trailing_zeros_are_not_precision() {
        let amount = UsdcAmount::new(dec!(5.500000000)).unwrap();
        assert_eq!(amount.amount(), dec!(5.5));
    }

    #[test]
    fn test_positive_rejects_zero() {
        assert_eq!(UsdcAmount::positive(dec!(0)), Err(MoneyError::NotPositive));
    }

    #[test]
    fn test_upper_bound_matches_column_precision() {
        assert_eq!(MAX_USDC_AMOUNT, dec!(99999999999999.999999));
        assert!(UsdcAmount::positive(MAX_USDC_AMOUNT).is_ok());
        assert_eq!(UsdcAmount::positive(dec!(100000000000000)), Err(MoneyError::TooLarge));
    }

    #[test]
    fn test_sum_past_the_bound_is_rejected() {
        let max = UsdcAmount::new(MAX_USDC_AMOUNT).unwrap();
        let cent = UsdcAmount::new(dec!(0.01)).unwrap();
        assert_eq!(max.checked_add(&cent), Err(MoneyError::TooLarge));
    }

    #[test]
    fn test_display_keeps_every_decimal() {
        assert_eq!(UsdcAmount::new(dec!(12.345678)).unwrap().to_string(), "12.345678 USDC");
        assert_eq!(UsdcAmount::new(dec!(1250.00)).unwrap().to_string(), "1250 USDC");
        assert_eq!(UsdcAmount::new(dec!(0.5)).unwrap().to_string(), "0.5 USDC");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn base_units_survive_conversion(units in 0u128..1_000_000_000_000_000u128) {
            let amount = UsdcAmount::from_base_units(units).unwrap();
            prop_assert_eq!(amount.to_base_units().unwrap(), units);
        }
    }
}
