//! Fixed-point currency amounts
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Amounts are strictly positive and carry at most two decimal places.

use crate::errors::EngineError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A strictly positive currency amount with cent precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    /// Create an amount, rejecting zero, negative, and sub-cent values
    pub fn new(value: Decimal) -> Result<Self, EngineError> {
        if value <= Decimal::ZERO {
            return Err(EngineError::validation("amount", "must be positive"));
        }
        if value.scale() > 2 {
            return Err(EngineError::validation(
                "amount",
                "at most two decimal places",
            ));
        }
        Ok(Self(value))
    }

    /// Create from whole currency units
    ///
    /// # Panics
    /// Panics if `units` is zero. Intended for literals in tests and fixtures.
    pub fn from_u64(units: u64) -> Self {
        assert!(units > 0, "Amount must be positive");
        Self(Decimal::from(units))
    }

    /// Parse from a decimal string, e.g. `"150.00"`
    pub fn from_str(s: &str) -> Result<Self, EngineError> {
        let value: Decimal = s
            .parse()
            .map_err(|_| EngineError::validation("amount", "not a decimal number"))?;
        Self::new(value)
    }

    /// Get the inner decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Absolute difference between two amounts, in currency units
    pub fn abs_diff(&self, other: &Amount) -> Decimal {
        (self.0 - other.0).abs()
    }

    /// True if this amount is greater than or equal to `other`
    ///
    /// A deposit covers a withdrawal when its amount is at least as large.
    pub fn covers(&self, other: &Amount) -> bool {
        self.0 >= other.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
