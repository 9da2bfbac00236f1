use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A holding derived from transaction replay up to an as-of date.
///
/// Cost basis here is the simplified weighted-average model used for
/// display: partial sells rescale `total_cost` to `quantity * average_cost`
/// so the average survives the sell. Realized-gain accounting uses the
/// separate FIFO lot engine instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub average_cost: Decimal,
    pub total_cost: Decimal,
    /// Cash dividend income accrued by this holding. Never folded into
    /// cost basis.
    pub dividend_income: Decimal,
    pub currency: String,
}

impl Position {
    pub fn new(symbol: &str, currency: &str) -> Self {
        Position {
            symbol: symbol.to_string(),
            quantity: Decimal::ZERO,
            average_cost: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            dividend_income: Decimal::ZERO,
            currency: currency.to_string(),
        }
    }
}
