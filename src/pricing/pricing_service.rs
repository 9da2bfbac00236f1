use chrono::NaiveDate;
use dashmap::DashMap;
use futures::future::join_all;
use log::warn;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::PriceOracleTrait;
use crate::assets::SymbolProfile;
use crate::errors::Result;

/// Resolves the price of a symbol at or before a given date.
///
/// Market symbols resolve from the oracle's daily close series, custom
/// symbols from the per-user manual price series. For account-kind symbols
/// the resolved number is the account balance on that date, not a per-unit
/// price; callers are responsible for not multiplying it by quantity.
///
/// Each symbol's full series is fetched once and cached, so repeated
/// per-day lookups during series reconstruction stay cheap. The cache is an
/// optimization only; `price_at` is the contract.
pub struct PriceResolver {
    oracle: Arc<dyn PriceOracleTrait>,
    series_cache: DashMap<(String, bool), Arc<BTreeMap<NaiveDate, Decimal>>>,
}

impl PriceResolver {
    pub fn new(oracle: Arc<dyn PriceOracleTrait>) -> Self {
        PriceResolver {
            oracle,
            series_cache: DashMap::new(),
        }
    }

    /// Latest known price at or before `date`, or `None` if the series has
    /// no entry that early.
    pub async fn price_at(
        &self,
        profile: &SymbolProfile,
        date: NaiveDate,
    ) -> Result<Option<Decimal>> {
        let series = self.series_for(profile).await?;
        Ok(Self::latest_at(&series, date))
    }

    /// Current price, with the priority order that keeps stale cached
    /// prices from shadowing fresh manual entries:
    /// - market symbols prefer the profile's stored last price, falling
    ///   back to the newest series entry;
    /// - custom symbols always resolve from the newest manual entry.
    pub async fn current_price(&self, profile: &SymbolProfile) -> Result<Option<Decimal>> {
        if !profile.is_custom {
            if let Some(last) = profile.last_price {
                return Ok(Some(last));
            }
        }
        let series = self.series_for(profile).await?;
        Ok(series.iter().next_back().map(|(_, price)| *price))
    }

    /// Warms the cache for a set of symbols concurrently. Failures are
    /// logged and left for the per-date lookup to surface.
    pub async fn prefetch(&self, profiles: &[&SymbolProfile]) {
        let fetches = profiles.iter().map(|profile| self.series_for(profile));
        for (profile, result) in profiles.iter().zip(join_all(fetches).await) {
            if let Err(e) = result {
                warn!(
                    "Prefetch of price series for '{}' failed: {}",
                    profile.symbol, e
                );
            }
        }
    }

    async fn series_for(
        &self,
        profile: &SymbolProfile,
    ) -> Result<Arc<BTreeMap<NaiveDate, Decimal>>> {
        let key = (profile.symbol.clone(), profile.is_custom);
        if let Some(cached) = self.series_cache.get(&key) {
            return Ok(cached.clone());
        }

        let series = if profile.is_custom {
            self.oracle.get_manual_price_series(&profile.symbol).await?
        } else {
            self.oracle.get_price_series(&profile.symbol).await?
        };

        let series = Arc::new(series);
        self.series_cache.insert(key, series.clone());
        Ok(series)
    }

    fn latest_at(series: &BTreeMap<NaiveDate, Decimal>, date: NaiveDate) -> Option<Decimal> {
        series.range(..=date).next_back().map(|(_, price)| *price)
    }
}
