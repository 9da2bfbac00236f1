use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalculatorError {
    #[error("Calculation error: {0}")]
    Calculation(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}
