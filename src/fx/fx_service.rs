use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use crate::assets::SymbolProfile;
use crate::constants::PIVOT_CURRENCY;
use crate::pricing::PriceResolver;

/// Fallback CURRENCYUSD rates, used when no quote resolves at or before the
/// requested date.
const FALLBACK_RATES: &[(&str, Decimal)] = &[("EUR", dec!(1.10)), ("GBP", dec!(1.27))];

/// Converts amounts between currencies via a USD-pivot cross rate.
///
/// Every supported non-USD currency is quoted as a `CURRENCYUSD`
/// pseudo-symbol (units of USD per unit of currency) resolved through the
/// price resolver for the requested date. The cross rate is then
/// `from_usd / to_usd`.
///
/// Failure policy: a missing rate degrades to a fallback for that single
/// conversion with a logged warning. Conversion never aborts the
/// computation that requested it.
pub struct CurrencyConverter {
    resolver: Arc<PriceResolver>,
}

impl CurrencyConverter {
    pub fn new(resolver: Arc<PriceResolver>) -> Self {
        CurrencyConverter { resolver }
    }

    /// Exchange rate `from -> to` on `date`. Same currency is exactly 1,
    /// with no lookup.
    pub async fn rate(&self, from: &str, to: &str, date: NaiveDate) -> Decimal {
        if from == to {
            return Decimal::ONE;
        }

        let from_usd = self.usd_rate(from, date).await;
        let to_usd = self.usd_rate(to, date).await;

        if to_usd.is_zero() {
            warn!(
                "Zero USD rate for '{}' on {}; falling back to rate 1 for {}->{}",
                to, date, from, to
            );
            return Decimal::ONE;
        }

        from_usd / to_usd
    }

    pub async fn convert(&self, amount: Decimal, from: &str, to: &str, date: NaiveDate) -> Decimal {
        if from == to {
            return amount;
        }
        amount * self.rate(from, to, date).await
    }

    /// USD per unit of `currency` on `date`, via the CURRENCYUSD
    /// pseudo-symbol or the fallback constant.
    async fn usd_rate(&self, currency: &str, date: NaiveDate) -> Decimal {
        if currency == PIVOT_CURRENCY {
            return Decimal::ONE;
        }

        let pair = format!("{}{}", currency, PIVOT_CURRENCY);
        let profile = SymbolProfile::currency_pair(&pair);

        match self.resolver.price_at(&profile, date).await {
            Ok(Some(rate)) if !rate.is_zero() => rate,
            Ok(_) => {
                let fallback = Self::fallback_rate(currency);
                warn!(
                    "No {} quote at or before {}; using fallback rate {}",
                    pair, date, fallback
                );
                fallback
            }
            Err(e) => {
                let fallback = Self::fallback_rate(currency);
                warn!(
                    "Rate lookup for {} on {} failed ({}); using fallback rate {}",
                    pair, date, e, fallback
                );
                fallback
            }
        }
    }

    fn fallback_rate(currency: &str) -> Decimal {
        FALLBACK_RATES
            .iter()
            .find(|(ccy, _)| *ccy == currency)
            .map(|(_, rate)| *rate)
            .unwrap_or(Decimal::ONE)
    }
}
