use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::Position;
use crate::assets::SymbolProfile;
use crate::ledger::{Transaction, TransactionType};

/// Replays the ledger into per-symbol positions as of `as_of`.
///
/// Pure function of its inputs; malformed transactions are tolerated rather
/// than rejected. Selling more than held drives quantity negative until the
/// next buy (current behavior, intentionally not clamped).
///
/// `include_closed` keeps fully-sold positions in the output with a zeroed
/// cost basis so single-holding series can continue past a liquidation.
/// Whole-portfolio queries pass `false` and drop them. Account-kind
/// holdings are always retained: their quantity is not meaningful and their
/// value comes from the resolved balance.
pub fn build_positions(
    transactions: &[Transaction],
    profiles: &HashMap<String, SymbolProfile>,
    as_of: NaiveDate,
    target_symbol: Option<&str>,
    include_closed: bool,
) -> HashMap<String, Position> {
    let mut filtered: Vec<&Transaction> = transactions
        .iter()
        .filter(|tx| tx.transaction_date <= as_of)
        .filter(|tx| target_symbol.map_or(true, |symbol| tx.symbol == symbol))
        .collect();
    filtered.sort_by_key(|tx| tx.transaction_date);

    let mut positions: HashMap<String, Position> = HashMap::new();
    let mut closed: Vec<String> = Vec::new();

    for tx in filtered {
        let currency = profiles
            .get(&tx.symbol)
            .map(|profile| profile.currency.as_str())
            .unwrap_or(tx.currency.as_str());
        let position = positions
            .entry(tx.symbol.clone())
            .or_insert_with(|| Position::new(&tx.symbol, currency));

        match tx.transaction_type {
            TransactionType::Buy => {
                // Fees stay out of the display cost basis; the FIFO lot
                // engine accounts for them on the realized-gain side.
                add_shares(position, tx.quantity, tx.unit_price);
            }
            TransactionType::Sell => {
                position.quantity -= tx.quantity;
                if position.quantity <= Decimal::ZERO {
                    position.total_cost = Decimal::ZERO;
                    position.average_cost = Decimal::ZERO;
                    if !include_closed {
                        closed.push(tx.symbol.clone());
                    }
                } else {
                    // Average cost survives a partial sell; the remaining
                    // cost is rescaled, not lot-matched.
                    position.total_cost = position.quantity * position.average_cost;
                    closed.retain(|symbol| symbol != &tx.symbol);
                }
            }
            TransactionType::Deposit => {
                position.total_cost += tx.amount_or_zero();
            }
            TransactionType::Withdrawal => {
                let reduced = position.total_cost - tx.amount_or_zero();
                position.total_cost = reduced.max(Decimal::ZERO);
            }
            TransactionType::Dividend => {
                if tx.quantity > Decimal::ZERO {
                    // Stock dividend / DRIP: shares enter at the stated
                    // price (usually zero), diluting the average cost.
                    add_shares(position, tx.quantity, tx.unit_price);
                } else {
                    position.dividend_income += tx.amount_or_zero();
                }
            }
            TransactionType::Bonus => {
                add_shares(position, tx.quantity, tx.unit_price);
            }
        }

        if position.quantity > Decimal::ZERO {
            closed.retain(|symbol| symbol != &tx.symbol);
        }
    }

    for symbol in closed {
        positions.remove(&symbol);
    }

    // Zero-quantity positions survive only for account-kind symbols or when
    // the caller asked to see closed holdings.
    positions.retain(|symbol, position| {
        if position.quantity > Decimal::ZERO {
            return true;
        }
        let is_account = profiles
            .get(symbol)
            .map(|profile| profile.is_account())
            .unwrap_or(false);
        if position.quantity < Decimal::ZERO && !include_closed && !is_account {
            warn!(
                "Position '{}' has negative quantity {} as of {}; dropping from portfolio view",
                symbol, position.quantity, as_of
            );
        }
        is_account || include_closed
    });

    positions
}

fn add_shares(position: &mut Position, quantity: Decimal, unit_price: Decimal) {
    if quantity <= Decimal::ZERO {
        return;
    }
    position.quantity += quantity;
    position.total_cost += quantity * unit_price;
    if position.quantity > Decimal::ZERO {
        position.average_cost = position.total_cost / position.quantity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetType, HoldingKind};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(
        id: &str,
        transaction_type: TransactionType,
        symbol: &str,
        d: NaiveDate,
        quantity: Decimal,
        unit_price: Decimal,
        amount: Option<Decimal>,
    ) -> Transaction {
        Transaction {
            id: id.to_string(),
            symbol: symbol.to_string(),
            transaction_type,
            transaction_date: d,
            quantity,
            unit_price,
            amount,
            fee: Decimal::ZERO,
            currency: "USD".to_string(),
        }
    }

    fn profiles(entries: &[(&str, AssetType, HoldingKind)]) -> HashMap<String, SymbolProfile> {
        entries
            .iter()
            .map(|(symbol, asset_type, kind)| {
                let mut profile = SymbolProfile::new(symbol, *asset_type, "USD");
                profile.holding_kind = *kind;
                (symbol.to_string(), profile)
            })
            .collect()
    }

    fn stock_profiles(symbols: &[&str]) -> HashMap<String, SymbolProfile> {
        profiles(
            &symbols
                .iter()
                .map(|s| (*s, AssetType::Stock, HoldingKind::Security))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn weighted_average_over_successive_buys() {
        let transactions = vec![
            tx(
                "1",
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(10),
                dec!(100),
                None,
            ),
            tx(
                "2",
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 10),
                dec!(10),
                dec!(120),
                None,
            ),
        ];
        let positions = build_positions(
            &transactions,
            &stock_profiles(&["AAPL"]),
            date(2024, 2, 1),
            None,
            false,
        );

        let position = &positions["AAPL"];
        assert_eq!(position.quantity, dec!(20));
        assert_eq!(position.total_cost, dec!(2200));
        assert_eq!(position.average_cost, dec!(110));
    }

    #[test]
    fn bonus_shares_dilute_average_cost_without_new_capital() {
        let transactions = vec![
            tx(
                "1",
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(10),
                dec!(100),
                None,
            ),
            tx(
                "2",
                TransactionType::Bonus,
                "AAPL",
                date(2024, 2, 1),
                dec!(10),
                dec!(0),
                None,
            ),
        ];
        let positions = build_positions(
            &transactions,
            &stock_profiles(&["AAPL"]),
            date(2024, 3, 1),
            None,
            false,
        );

        let position = &positions["AAPL"];
        assert_eq!(position.quantity, dec!(20));
        assert_eq!(position.total_cost, dec!(1000));
        assert_eq!(position.average_cost, dec!(50));
    }

    #[test]
    fn cash_dividend_touches_income_only() {
        let transactions = vec![
            tx(
                "1",
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(10),
                dec!(100),
                None,
            ),
            tx(
                "2",
                TransactionType::Dividend,
                "AAPL",
                date(2024, 2, 1),
                dec!(0),
                dec!(0),
                Some(dec!(25)),
            ),
        ];
        let positions = build_positions(
            &transactions,
            &stock_profiles(&["AAPL"]),
            date(2024, 3, 1),
            None,
            false,
        );

        let position = &positions["AAPL"];
        assert_eq!(position.quantity, dec!(10));
        assert_eq!(position.total_cost, dec!(1000));
        assert_eq!(position.average_cost, dec!(100));
        assert_eq!(position.dividend_income, dec!(25));
    }

    #[test]
    fn partial_sell_preserves_average_cost() {
        let transactions = vec![
            tx(
                "1",
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(10),
                dec!(100),
                None,
            ),
            tx(
                "2",
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 10),
                dec!(10),
                dec!(120),
                None,
            ),
            tx(
                "3",
                TransactionType::Sell,
                "AAPL",
                date(2024, 2, 1),
                dec!(5),
                dec!(150),
                None,
            ),
        ];
        let positions = build_positions(
            &transactions,
            &stock_profiles(&["AAPL"]),
            date(2024, 3, 1),
            None,
            false,
        );

        let position = &positions["AAPL"];
        assert_eq!(position.quantity, dec!(15));
        assert_eq!(position.average_cost, dec!(110));
        assert_eq!(position.total_cost, dec!(1650));
    }

    #[test]
    fn full_sell_drops_position_from_portfolio_view() {
        let transactions = vec![
            tx(
                "1",
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(10),
                dec!(100),
                None,
            ),
            tx(
                "2",
                TransactionType::Sell,
                "AAPL",
                date(2024, 2, 1),
                dec!(10),
                dec!(150),
                None,
            ),
        ];
        let profiles = stock_profiles(&["AAPL"]);

        let portfolio = build_positions(&transactions, &profiles, date(2024, 3, 1), None, false);
        assert!(portfolio.is_empty());

        // Single-holding queries keep the liquidated position around.
        let single =
            build_positions(&transactions, &profiles, date(2024, 3, 1), Some("AAPL"), true);
        let position = &single["AAPL"];
        assert_eq!(position.quantity, dec!(0));
        assert_eq!(position.total_cost, dec!(0));
        assert_eq!(position.average_cost, dec!(0));
    }

    #[test]
    fn closed_then_reopened_position_starts_fresh() {
        let transactions = vec![
            tx(
                "1",
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(10),
                dec!(100),
                None,
            ),
            tx(
                "2",
                TransactionType::Sell,
                "AAPL",
                date(2024, 2, 1),
                dec!(10),
                dec!(150),
                None,
            ),
            tx(
                "3",
                TransactionType::Buy,
                "AAPL",
                date(2024, 3, 1),
                dec!(4),
                dec!(200),
                None,
            ),
        ];
        let positions = build_positions(
            &transactions,
            &stock_profiles(&["AAPL"]),
            date(2024, 4, 1),
            None,
            false,
        );

        let position = &positions["AAPL"];
        assert_eq!(position.quantity, dec!(4));
        assert_eq!(position.average_cost, dec!(200));
        assert_eq!(position.total_cost, dec!(800));
    }

    #[test]
    fn overselling_drives_quantity_negative() {
        // Tolerated, not endorsed: a sell exceeding the held quantity goes
        // negative instead of erroring.
        let transactions = vec![
            tx(
                "1",
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(10),
                dec!(100),
                None,
            ),
            tx(
                "2",
                TransactionType::Sell,
                "AAPL",
                date(2024, 2, 1),
                dec!(15),
                dec!(150),
                None,
            ),
        ];
        let positions = build_positions(
            &transactions,
            &stock_profiles(&["AAPL"]),
            date(2024, 3, 1),
            Some("AAPL"),
            true,
        );

        let position = &positions["AAPL"];
        assert_eq!(position.quantity, dec!(-5));
        assert_eq!(position.total_cost, dec!(0));
    }

    #[test]
    fn deposits_and_withdrawals_adjust_account_cost_basis() {
        let transactions = vec![
            tx(
                "1",
                TransactionType::Deposit,
                "SAVINGS",
                date(2024, 1, 2),
                dec!(0),
                dec!(0),
                Some(dec!(1000)),
            ),
            tx(
                "2",
                TransactionType::Withdrawal,
                "SAVINGS",
                date(2024, 2, 1),
                dec!(0),
                dec!(0),
                Some(dec!(1500)),
            ),
        ];
        let profiles = profiles(&[("SAVINGS", AssetType::Cash, HoldingKind::Account)]);
        let positions =
            build_positions(&transactions, &profiles, date(2024, 3, 1), None, false);

        // Withdrawal floors at zero, and the account survives with zero
        // quantity.
        let position = &positions["SAVINGS"];
        assert_eq!(position.quantity, dec!(0));
        assert_eq!(position.total_cost, dec!(0));
    }

    #[test]
    fn cutoff_and_symbol_filters_apply() {
        let transactions = vec![
            tx(
                "1",
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(10),
                dec!(100),
                None,
            ),
            tx(
                "2",
                TransactionType::Buy,
                "MSFT",
                date(2024, 1, 3),
                dec!(5),
                dec!(300),
                None,
            ),
            tx(
                "3",
                TransactionType::Buy,
                "AAPL",
                date(2024, 6, 1),
                dec!(10),
                dec!(200),
                None,
            ),
        ];
        let profiles = stock_profiles(&["AAPL", "MSFT"]);

        let positions =
            build_positions(&transactions, &profiles, date(2024, 2, 1), Some("AAPL"), true);
        assert_eq!(positions.len(), 1);
        assert_eq!(positions["AAPL"].quantity, dec!(10));
        assert_eq!(positions["AAPL"].average_cost, dec!(100));
    }
}
