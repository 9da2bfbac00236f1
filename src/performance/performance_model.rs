use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A FIFO accounting unit: a quantity acquired at a specific per-unit cost,
/// consumed front-to-back on disposal.
#[derive(Debug, Clone, PartialEq)]
pub struct Lot {
    pub quantity: Decimal,
    pub cost_per_unit: Decimal,
}

/// Dated cash flow used by the money-weighted return solver. Outflows are
/// negative.
#[derive(Debug, Clone, PartialEq)]
pub struct CashFlow {
    pub date: NaiveDate,
    pub amount: Decimal,
}

/// Annualized performance metrics with a realized/unrealized P&L breakdown.
///
/// The all-zero value (dates `None`) is the designated sentinel for
/// insufficient data, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReturnMetrics {
    pub total_value: Decimal,
    pub total_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub capital_gains: Decimal,
    pub dividends: Decimal,
    pub cost_basis: Decimal,
    pub total_invested: Decimal,
    pub time_weighted_return: Decimal,
    pub money_weighted_return: Decimal,
    pub total_return_percentage: Decimal,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub period_years: Decimal,
}

impl ReturnMetrics {
    pub fn empty() -> Self {
        ReturnMetrics {
            total_value: Decimal::ZERO,
            total_pnl: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            capital_gains: Decimal::ZERO,
            dividends: Decimal::ZERO,
            cost_basis: Decimal::ZERO,
            total_invested: Decimal::ZERO,
            time_weighted_return: Decimal::ZERO,
            money_weighted_return: Decimal::ZERO,
            total_return_percentage: Decimal::ZERO,
            start_date: None,
            end_date: None,
            period_years: Decimal::ZERO,
        }
    }
}
