use chrono::Utc;
use futures::future::join_all;
use log::warn;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use super::HoldingValuation;
use crate::assets::SymbolProfile;
use crate::constants::DECIMAL_PRECISION;
use crate::errors::Result;
use crate::fx::CurrencyConverter;
use crate::history::{HistoricalDataPoint, HistoryService};
use crate::ledger::{LedgerStoreTrait, Transaction};
use crate::performance::{calculate_returns, ReturnMetrics};
use crate::positions::build_positions;
use crate::pricing::{PriceOracleTrait, PriceResolver};

/// Entry point wiring the ledger store and price oracle into the valuation
/// pipeline. All collaborators are injected; the service holds no state
/// beyond them and every query recomputes from the immutable ledger.
pub struct PortfolioService {
    ledger: Arc<dyn LedgerStoreTrait>,
    resolver: Arc<PriceResolver>,
    converter: Arc<CurrencyConverter>,
    history: HistoryService,
}

impl PortfolioService {
    pub fn new(ledger: Arc<dyn LedgerStoreTrait>, oracle: Arc<dyn PriceOracleTrait>) -> Self {
        let resolver = Arc::new(PriceResolver::new(oracle));
        let converter = Arc::new(CurrencyConverter::new(resolver.clone()));
        let history = HistoryService::new(resolver.clone(), converter.clone());
        PortfolioService {
            ledger,
            resolver,
            converter,
            history,
        }
    }

    /// Current holdings valued at current prices in `target_currency`.
    pub async fn get_holdings(
        &self,
        user_id: &str,
        target_currency: &str,
    ) -> Result<Vec<HoldingValuation>> {
        let (transactions, profiles) = self.load_ledger(user_id).await?;
        let today = Utc::now().date_naive();
        let positions = build_positions(&transactions, &profiles, today, None, false);

        let entries: Vec<_> = positions
            .into_values()
            .filter_map(|position| match profiles.get(&position.symbol) {
                Some(profile) => Some((position, profile.clone())),
                None => {
                    warn!(
                        "No symbol descriptor for '{}'; holding omitted from valuation",
                        position.symbol
                    );
                    None
                }
            })
            .collect();

        let lookups = entries
            .iter()
            .map(|(_, profile)| self.resolver.current_price(profile));
        let prices = join_all(lookups).await;

        let mut holdings = Vec::with_capacity(entries.len());
        for ((position, profile), price) in entries.into_iter().zip(prices) {
            let market_price = match price {
                Ok(price) => price,
                Err(e) => {
                    warn!(
                        "Current price lookup for '{}' failed: {}; valuing at zero",
                        profile.symbol, e
                    );
                    None
                }
            };
            let native_value = match market_price {
                Some(price) if profile.is_account() => price,
                Some(price) => position.quantity * price,
                None => Decimal::ZERO,
            };
            let market_value = self
                .converter
                .convert(native_value, &profile.currency, target_currency, today)
                .await
                .round_dp(DECIMAL_PRECISION);

            holdings.push(HoldingValuation {
                position,
                market_price,
                market_value,
                currency: target_currency.to_string(),
            });
        }

        holdings.sort_by(|a, b| a.position.symbol.cmp(&b.position.symbol));
        Ok(holdings)
    }

    /// Daily valuation series for the whole portfolio, or a single holding
    /// when `target_symbol` is given.
    pub async fn get_history(
        &self,
        user_id: &str,
        target_currency: &str,
        target_symbol: Option<&str>,
    ) -> Result<Vec<HistoricalDataPoint>> {
        let (transactions, profiles) = self.load_ledger(user_id).await?;
        self.history
            .build_series(&transactions, &profiles, target_currency, target_symbol)
            .await
    }

    /// Return metrics over the full ledger span.
    pub async fn get_performance(
        &self,
        user_id: &str,
        target_currency: &str,
        target_symbol: Option<&str>,
    ) -> Result<ReturnMetrics> {
        let (transactions, profiles) = self.load_ledger(user_id).await?;
        let series = self
            .history
            .build_series(&transactions, &profiles, target_currency, target_symbol)
            .await?;

        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Ok(ReturnMetrics::empty());
        };
        let (start_date, end_date) = (first.date, last.date);

        let scoped: Vec<Transaction> = transactions
            .into_iter()
            .filter(|tx| target_symbol.map_or(true, |symbol| tx.symbol == symbol))
            .collect();

        Ok(calculate_returns(&scoped, &series, start_date, end_date))
    }

    async fn load_ledger(
        &self,
        user_id: &str,
    ) -> Result<(Vec<Transaction>, HashMap<String, SymbolProfile>)> {
        let transactions = self.ledger.get_transactions(user_id).await?;
        let profiles = self
            .ledger
            .get_symbols(user_id)
            .await?
            .into_iter()
            .map(|profile| (profile.symbol.clone(), profile))
            .collect();
        Ok((transactions, profiles))
    }
}
