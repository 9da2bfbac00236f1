use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Unsupported transaction type: {0}")]
    InvalidTransactionType(String),

    #[error("Invalid transaction data: {0}")]
    InvalidData(String),

    #[error("Ledger store access failed: {0}")]
    StoreError(String),
}
