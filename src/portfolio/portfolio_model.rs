use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::positions::Position;

/// A current position valued at current prices in the requested currency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HoldingValuation {
    pub position: Position,
    /// Resolved current price in the symbol's own currency; `None` when no
    /// price exists (the holding still appears, valued at zero).
    pub market_price: Option<Decimal>,
    /// Value in the target currency. For account-kind holdings this is the
    /// converted balance, not quantity times price.
    pub market_value: Decimal,
    pub currency: String,
}
