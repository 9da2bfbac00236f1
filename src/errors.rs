use thiserror::Error;

use crate::fx::FxError;
use crate::ledger::LedgerError;
use crate::performance::CalculatorError;
use crate::pricing::PricingError;

// Create a type alias for Result using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the valuation engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Price resolution failed: {0}")]
    Pricing(#[from] PricingError),

    #[error("Currency operation failed: {0}")]
    Fx(#[from] FxError),

    #[error("Calculation failed: {0}")]
    Calculation(#[from] CalculatorError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}
