use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::errors::Result;

/// Injected source of historical prices.
///
/// Market symbols are served from `get_price_series` (externally-sourced
/// daily closes). Custom symbols are served from `get_manual_price_series`
/// (user-entered price points). Exchange-rate pseudo-symbols such as
/// `EURUSD` go through `get_price_series` like any other market symbol.
///
/// An empty map is a valid answer; lookups then resolve to `None`.
#[async_trait]
pub trait PriceOracleTrait: Send + Sync {
    async fn get_price_series(&self, symbol: &str) -> Result<BTreeMap<NaiveDate, Decimal>>;

    async fn get_manual_price_series(&self, symbol: &str) -> Result<BTreeMap<NaiveDate, Decimal>>;
}
