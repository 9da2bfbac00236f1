use thiserror::Error;

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("Price series unavailable for symbol '{0}': {1}")]
    SeriesUnavailable(String, String),

    #[error("Price oracle failure: {0}")]
    OracleError(String),
}
