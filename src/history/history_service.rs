use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use log::{debug, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;

use super::HistoricalDataPoint;
use crate::assets::SymbolProfile;
use crate::constants::DECIMAL_PRECISION;
use crate::errors::Result;
use crate::fx::CurrencyConverter;
use crate::ledger::Transaction;
use crate::positions::{build_positions, Position};
use crate::pricing::PriceResolver;

/// Reconstructs the daily valuation series from the ledger.
///
/// Days are processed sequentially (each depends only on the cumulative
/// transaction history); price lookups for the positions of a single day
/// fan out concurrently.
pub struct HistoryService {
    resolver: Arc<PriceResolver>,
    converter: Arc<CurrencyConverter>,
}

impl HistoryService {
    pub fn new(resolver: Arc<PriceResolver>, converter: Arc<CurrencyConverter>) -> Self {
        HistoryService {
            resolver,
            converter,
        }
    }

    /// Series from the earliest transaction through today.
    pub async fn build_series(
        &self,
        transactions: &[Transaction],
        profiles: &HashMap<String, SymbolProfile>,
        target_currency: &str,
        target_symbol: Option<&str>,
    ) -> Result<Vec<HistoricalDataPoint>> {
        let today = Utc::now().date_naive();
        self.build_series_until(transactions, profiles, target_currency, target_symbol, today)
            .await
    }

    /// Series through an explicit end date (inclusive).
    pub async fn build_series_until(
        &self,
        transactions: &[Transaction],
        profiles: &HashMap<String, SymbolProfile>,
        target_currency: &str,
        target_symbol: Option<&str>,
        end_date: NaiveDate,
    ) -> Result<Vec<HistoricalDataPoint>> {
        // Filter before anything else so another holding's dividends can
        // never leak into a single-holding series.
        let scoped: Vec<Transaction> = transactions
            .iter()
            .filter(|tx| target_symbol.map_or(true, |symbol| tx.symbol == symbol))
            .cloned()
            .collect();

        let start_date = match scoped.iter().map(|tx| tx.transaction_date).min() {
            Some(first) => first,
            None => return Ok(Vec::new()),
        };

        let relevant: Vec<&SymbolProfile> = profiles
            .values()
            .filter(|profile| scoped.iter().any(|tx| tx.symbol == profile.symbol))
            .collect();
        self.resolver.prefetch(&relevant).await;

        let dividends = self
            .converted_dividends(&scoped, target_currency)
            .await;
        let mut dividend_index = 0usize;
        let mut cumulative_dividends = Decimal::ZERO;

        // Single-holding series keep iterating past a liquidation; a fully
        // liquidated portfolio stops producing points instead.
        let include_closed = target_symbol.is_some();

        let mut series = Vec::new();
        let mut day = start_date;
        while day <= end_date {
            while dividend_index < dividends.len() && dividends[dividend_index].0 <= day {
                cumulative_dividends += dividends[dividend_index].1;
                dividend_index += 1;
            }

            let positions =
                build_positions(&scoped, profiles, day, target_symbol, include_closed);
            if let Some(point) = self
                .value_positions(
                    &positions,
                    profiles,
                    target_currency,
                    target_symbol,
                    cumulative_dividends,
                    day,
                )
                .await
            {
                series.push(point);
            }

            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }

        Ok(series)
    }

    /// Values one day's positions. Returns `None` when the day has no
    /// positions at all or no position has a resolvable price; partial
    /// coverage still produces a point from the priced positions only.
    async fn value_positions(
        &self,
        positions: &HashMap<String, Position>,
        profiles: &HashMap<String, SymbolProfile>,
        target_currency: &str,
        target_symbol: Option<&str>,
        cumulative_dividends: Decimal,
        day: NaiveDate,
    ) -> Option<HistoricalDataPoint> {
        if positions.is_empty() {
            return None;
        }

        let entries: Vec<(&Position, &SymbolProfile)> = positions
            .values()
            .filter_map(|position| match profiles.get(&position.symbol) {
                Some(profile) => Some((position, profile)),
                None => {
                    warn!(
                        "No symbol descriptor for '{}'; skipping its valuation on {}",
                        position.symbol, day
                    );
                    None
                }
            })
            .collect();

        let lookups = entries
            .iter()
            .map(|(_, profile)| self.resolver.price_at(profile, day));
        let prices = join_all(lookups).await;

        let mut asset_type_values: HashMap<String, Decimal> = HashMap::new();
        let mut cost_basis = Decimal::ZERO;
        let mut any_priced = false;

        for ((position, profile), price) in entries.iter().zip(prices) {
            let price = match price {
                Ok(Some(price)) => price,
                Ok(None) => {
                    debug!(
                        "No price for '{}' at or before {}; position skipped for the day",
                        profile.symbol, day
                    );
                    continue;
                }
                Err(e) => {
                    warn!(
                        "Price lookup for '{}' on {} failed: {}; position skipped for the day",
                        profile.symbol, day, e
                    );
                    continue;
                }
            };
            any_priced = true;

            // Account-kind symbols report a balance, not a per-unit price.
            let native_value = if profile.is_account() {
                price
            } else {
                position.quantity * price
            };
            let converted = self
                .converter
                .convert(native_value, &profile.currency, target_currency, day)
                .await;
            *asset_type_values
                .entry(profile.asset_type.as_str().to_string())
                .or_insert(Decimal::ZERO) += converted;

            cost_basis += self
                .converter
                .convert(position.total_cost, &profile.currency, target_currency, day)
                .await;
        }

        if !any_priced {
            debug!("No resolvable price for any position on {}; day skipped", day);
            return None;
        }

        let total_value: Decimal = asset_type_values.values().copied().sum();

        let asset_type_allocations = if let Some(symbol) = target_symbol {
            // A single holding is trivially 100% of itself.
            let asset_type = profiles
                .get(symbol)
                .map(|profile| profile.asset_type.as_str().to_string())
                .unwrap_or_else(|| "OTHER".to_string());
            HashMap::from([(asset_type, dec!(100))])
        } else {
            asset_type_values
                .iter()
                .map(|(bucket, value)| {
                    let share = if total_value.is_zero() {
                        Decimal::ZERO
                    } else {
                        (value / total_value * dec!(100)).round_dp(DECIMAL_PRECISION)
                    };
                    (bucket.clone(), share)
                })
                .collect()
        };

        Some(HistoricalDataPoint {
            date: day,
            total_value: total_value.round_dp(DECIMAL_PRECISION),
            asset_type_values: asset_type_values
                .into_iter()
                .map(|(bucket, value)| (bucket, value.round_dp(DECIMAL_PRECISION)))
                .collect(),
            asset_type_allocations,
            cost_basis: cost_basis.round_dp(DECIMAL_PRECISION),
            cumulative_dividends: cumulative_dividends.round_dp(DECIMAL_PRECISION),
            currency: target_currency.to_string(),
        })
    }

    /// Cash dividends converted at their transaction date, sorted by date,
    /// ready for cumulative accumulation.
    async fn converted_dividends(
        &self,
        transactions: &[Transaction],
        target_currency: &str,
    ) -> Vec<(NaiveDate, Decimal)> {
        let mut dividends = Vec::new();
        for tx in transactions.iter().filter(|tx| tx.is_cash_dividend()) {
            let converted = self
                .converter
                .convert(
                    tx.amount_or_zero(),
                    &tx.currency,
                    target_currency,
                    tx.transaction_date,
                )
                .await;
            dividends.push((tx.transaction_date, converted));
        }
        dividends.sort_by_key(|(date, _)| *date);
        dividends
    }
}
