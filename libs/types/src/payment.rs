//! Payment methods and detail validation
//!
//! Payment details arrive as method-specific strings ("@handle", an email,
//! an account reference). They are validated once at the boundary so the
//! scoring and matching logic never sees malformed blobs.

use crate::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported peer-to-peer payment rails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Venmo,
    PayPal,
    CashApp,
    Cash,
    BankTransfer,
    Transfer,
}

impl PaymentMethod {
    /// Validate the method-specific detail string
    ///
    /// - Venmo / CashApp: an `@handle` with at least one character after `@`
    /// - PayPal: an email-shaped address
    /// - BankTransfer / Transfer: a non-empty account reference
    /// - Cash: free text (meeting instructions), may be empty
    pub fn validate_details(&self, details: &str) -> Result<(), EngineError> {
        let trimmed = details.trim();
        match self {
            PaymentMethod::Venmo | PaymentMethod::CashApp => {
                if trimmed.len() < 2 || !trimmed.starts_with('@') {
                    return Err(EngineError::validation(
                        "payment_details",
                        format!("{self} requires an @handle"),
                    ));
                }
            }
            PaymentMethod::PayPal => {
                let valid = trimmed
                    .split_once('@')
                    .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
                if !valid {
                    return Err(EngineError::validation(
                        "payment_details",
                        "PayPal requires an email address",
                    ));
                }
            }
            PaymentMethod::BankTransfer | PaymentMethod::Transfer => {
                if trimmed.is_empty() {
                    return Err(EngineError::validation(
                        "payment_details",
                        format!("{self} requires an account reference"),
                    ));
                }
            }
            PaymentMethod::Cash => {}
        }
        Ok(())
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentMethod::Venmo => "VENMO",
            PaymentMethod::PayPal => "PAY_PAL",
            PaymentMethod::CashApp => "CASH_APP",
            PaymentMethod::Cash => "CASH",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::Transfer => "TRANSFER",
        };
        write!(f, "{}", name)
    }
}
