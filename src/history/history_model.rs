use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One valuation point per calendar day, in the target currency.
///
/// `cumulative_dividends` is reported separately and deliberately excluded
/// from `total_value`: withdrawn dividends are gone, reinvested ones
/// already show up as position value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalDataPoint {
    pub date: NaiveDate,
    pub total_value: Decimal,
    /// Converted value per asset-type bucket.
    pub asset_type_values: HashMap<String, Decimal>,
    /// Percentage allocation per asset-type bucket, computed from the
    /// converted values so they sum to 100 net of currency effects.
    pub asset_type_allocations: HashMap<String, Decimal>,
    pub cost_basis: Decimal,
    pub cumulative_dividends: Decimal,
    pub currency: String,
}
