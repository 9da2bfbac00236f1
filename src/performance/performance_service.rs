use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};

use super::{CashFlow, Lot, ReturnMetrics};
use crate::history::HistoricalDataPoint;
use crate::ledger::{Transaction, TransactionType};

const DAYS_PER_YEAR: Decimal = dec!(365.25);
const PERCENT: Decimal = dec!(100);

const XIRR_MAX_ITERATIONS: u32 = 100;
const XIRR_TOLERANCE: Decimal = dec!(0.000001);
const XIRR_MIN_RATE: Decimal = dec!(-0.99);
const XIRR_MAX_RATE: Decimal = dec!(10);

/// Computes realized/unrealized P&L, time-weighted and money-weighted
/// returns from the transaction stream and the reconstructed daily series.
///
/// Realized gains use true FIFO lot matching over the whole transaction
/// history; this is deliberately a different cost-basis model from the
/// weighted-average one the position builder shows for current holdings.
pub fn calculate_returns(
    transactions: &[Transaction],
    series: &[HistoricalDataPoint],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> ReturnMetrics {
    if series.len() < 2 {
        debug!(
            "Not enough valuation points ({}) between {} and {}; returning empty metrics",
            series.len(),
            start_date,
            end_date
        );
        return ReturnMetrics::empty();
    }

    let actual_start = series.first().map(|p| p.date).unwrap_or(start_date);
    let actual_end = series.last().map(|p| p.date).unwrap_or(end_date);
    let days = (actual_end - actual_start).num_days();
    if days <= 0 {
        return ReturnMetrics::empty();
    }
    let period_years = Decimal::from(days) / DAYS_PER_YEAR;

    let mut sorted: Vec<&Transaction> = transactions.iter().collect();
    sorted.sort_by_key(|tx| tx.transaction_date);

    // FIFO replays the whole history (not just the window) so open-lot cost
    // basis is correct regardless of where the window starts.
    let (realized_pnl, cost_basis) = replay_fifo(&sorted);

    let in_range =
        |tx: &&&Transaction| tx.transaction_date >= actual_start && tx.transaction_date <= actual_end;

    let dividends: Decimal = sorted
        .iter()
        .filter(in_range)
        .filter(|tx| tx.is_cash_dividend())
        .map(|tx| tx.amount_or_zero())
        .sum();

    let total_invested: Decimal = sorted
        .iter()
        .filter(in_range)
        .filter(|tx| tx.transaction_type == TransactionType::Buy)
        .map(|tx| tx.quantity * tx.unit_price + tx.fee)
        .sum();

    let total_value = series.last().map(|p| p.total_value).unwrap_or(Decimal::ZERO);
    let unrealized_pnl = total_value - cost_basis;
    let capital_gains = realized_pnl + unrealized_pnl;
    let total_pnl = capital_gains + dividends;

    let total_return_percentage = if total_invested.is_zero() {
        Decimal::ZERO
    } else {
        total_pnl / total_invested * PERCENT
    };

    let time_weighted_return = time_weighted_return(&sorted, series, total_invested, period_years);

    let mut flows = cash_flows(&sorted, actual_start, actual_end);
    flows.push(CashFlow {
        date: actual_end,
        amount: total_value,
    });
    let money_weighted_return = xirr(&mut flows);

    ReturnMetrics {
        total_value,
        total_pnl,
        realized_pnl,
        unrealized_pnl,
        capital_gains,
        dividends,
        cost_basis,
        total_invested,
        time_weighted_return,
        money_weighted_return,
        total_return_percentage,
        start_date: Some(actual_start),
        end_date: Some(actual_end),
        period_years,
    }
}

/// Replays the full transaction history through per-symbol FIFO lot queues.
/// Returns the realized P&L over all sells and the cost basis of the lots
/// still open afterwards.
fn replay_fifo(sorted: &[&Transaction]) -> (Decimal, Decimal) {
    let mut lots: HashMap<String, VecDeque<Lot>> = HashMap::new();
    let mut realized = Decimal::ZERO;

    for tx in sorted {
        match tx.transaction_type {
            TransactionType::Buy => {
                if tx.quantity <= Decimal::ZERO {
                    continue;
                }
                let cost_per_unit = tx.unit_price + tx.fee / tx.quantity;
                lots.entry(tx.symbol.clone()).or_default().push_back(Lot {
                    quantity: tx.quantity,
                    cost_per_unit,
                });
            }
            TransactionType::Dividend | TransactionType::Bonus => {
                // Stock dividends and bonus shares enter the queue at
                // their stated price, typically zero.
                if tx.quantity > Decimal::ZERO {
                    lots.entry(tx.symbol.clone()).or_default().push_back(Lot {
                        quantity: tx.quantity,
                        cost_per_unit: tx.unit_price,
                    });
                }
            }
            TransactionType::Sell => {
                if tx.quantity <= Decimal::ZERO {
                    continue;
                }
                let fee_per_unit = tx.fee / tx.quantity;
                let queue = lots.entry(tx.symbol.clone()).or_default();
                let mut remaining = tx.quantity;

                while remaining > Decimal::ZERO {
                    let Some(front) = queue.front_mut() else {
                        warn!(
                            "Sell of {} '{}' on {} exceeds matched lots by {}; \
                             unmatched quantity ignored for realized P&L",
                            tx.quantity, tx.symbol, tx.transaction_date, remaining
                        );
                        break;
                    };
                    let matched = front.quantity.min(remaining);
                    realized +=
                        matched * (tx.unit_price - fee_per_unit - front.cost_per_unit);
                    front.quantity -= matched;
                    remaining -= matched;
                    if front.quantity <= Decimal::ZERO {
                        queue.pop_front();
                    }
                }
            }
            TransactionType::Deposit | TransactionType::Withdrawal => {}
        }
    }

    let open_cost: Decimal = lots
        .values()
        .flat_map(|queue| queue.iter())
        .map(|lot| lot.quantity * lot.cost_per_unit)
        .sum();

    (realized, open_cost)
}

/// Chains sub-period returns between consecutive valuation points:
/// `V_end / (V_start + cashFlow) - 1`, compounded, then annualized.
///
/// A fully-closed position (final value zero) degenerates under chaining,
/// so it falls back to a simple annualized realized return
/// `(proceeds / invested)^(1/years) - 1`.
fn time_weighted_return(
    sorted: &[&Transaction],
    series: &[HistoricalDataPoint],
    total_invested: Decimal,
    period_years: Decimal,
) -> Decimal {
    let final_value = series.last().map(|p| p.total_value).unwrap_or(Decimal::ZERO);

    if final_value.is_zero() {
        if total_invested.is_zero() {
            return Decimal::ZERO;
        }
        let proceeds: Decimal = sorted
            .iter()
            .filter(|tx| tx.transaction_type == TransactionType::Sell)
            .map(|tx| tx.quantity * tx.unit_price - tx.fee)
            .sum();
        if proceeds <= Decimal::ZERO {
            return dec!(-1);
        }
        return annualize(proceeds / total_invested - Decimal::ONE, period_years);
    }

    let mut compounded = Decimal::ONE;
    for window in series.windows(2) {
        let prev = &window[0];
        let curr = &window[1];

        // Net external flow strictly after the start point, at or before
        // the end point: buys in, sells and dividends out.
        let mut cash_flow = Decimal::ZERO;
        for tx in sorted
            .iter()
            .filter(|tx| tx.transaction_date > prev.date && tx.transaction_date <= curr.date)
        {
            match tx.transaction_type {
                TransactionType::Buy => {
                    cash_flow += tx.quantity * tx.unit_price + tx.fee;
                }
                TransactionType::Sell => {
                    cash_flow -= tx.quantity * tx.unit_price - tx.fee;
                }
                TransactionType::Dividend if tx.is_cash_dividend() => {
                    cash_flow -= tx.amount_or_zero();
                }
                _ => {}
            }
        }

        let denominator = prev.total_value + cash_flow;
        if denominator.is_zero() {
            continue;
        }
        compounded *= curr.total_value / denominator;
    }

    annualize(compounded - Decimal::ONE, period_years)
}

/// `(1 + total_return)^(1/years) - 1`, capped at a full loss when the base
/// would go non-positive.
fn annualize(total_return: Decimal, years: Decimal) -> Decimal {
    if years <= Decimal::ZERO {
        return total_return;
    }
    if total_return <= dec!(-1) {
        return dec!(-1);
    }
    let base = Decimal::ONE + total_return;
    if base <= Decimal::ZERO {
        return dec!(-1);
    }
    base.powd(Decimal::ONE / years) - Decimal::ONE
}

/// Builds the dated cash-flow list for the money-weighted return: buys and
/// deposits are outflows, sells, withdrawals, and cash dividends inflows.
fn cash_flows(sorted: &[&Transaction], start: NaiveDate, end: NaiveDate) -> Vec<CashFlow> {
    sorted
        .iter()
        .filter(|tx| tx.transaction_date >= start && tx.transaction_date <= end)
        .filter_map(|tx| {
            let amount = match tx.transaction_type {
                TransactionType::Buy => -(tx.quantity * tx.unit_price + tx.fee),
                TransactionType::Sell => tx.quantity * tx.unit_price - tx.fee,
                TransactionType::Dividend if tx.is_cash_dividend() => tx.amount_or_zero(),
                TransactionType::Deposit => -tx.amount_or_zero(),
                TransactionType::Withdrawal => tx.amount_or_zero(),
                _ => Decimal::ZERO,
            };
            if amount.is_zero() {
                None
            } else {
                Some(CashFlow {
                    date: tx.transaction_date,
                    amount,
                })
            }
        })
        .collect()
}

/// Solves `sum CF_i / (1+r)^(days_i/365.25) = 0` for `r` with Newton's
/// method. The rate is clamped to avoid divergence; a vanishing derivative
/// falls back to halving the previous step. If the NPV itself stops being
/// representable, the last in-clamp rate is returned rather than aborting.
pub fn xirr(flows: &mut [CashFlow]) -> Decimal {
    if flows.len() < 2 {
        return Decimal::ZERO;
    }
    flows.sort_by_key(|flow| flow.date);
    let epoch = flows[0].date;

    let mut rate = dec!(0.1);
    let mut step = Decimal::ZERO;

    for _ in 0..XIRR_MAX_ITERATIONS {
        let Some((npv, derivative)) = npv_with_derivative(flows, epoch, rate) else {
            return rate;
        };
        if npv.abs() < XIRR_TOLERANCE {
            return rate;
        }
        if derivative.is_zero() {
            if step.is_zero() {
                break;
            }
            step /= dec!(2);
        } else {
            step = npv / derivative;
        }
        rate = (rate - step).clamp(XIRR_MIN_RATE, XIRR_MAX_RATE);
    }

    rate
}

/// Checked evaluation: `None` when a term of the NPV or its derivative
/// leaves `Decimal`'s range, which happens for extreme flow amounts over
/// multi-decade horizons. A discount factor too large to represent only
/// drops that flow's negligible contribution.
fn npv_with_derivative(
    flows: &[CashFlow],
    epoch: NaiveDate,
    rate: Decimal,
) -> Option<(Decimal, Decimal)> {
    let base = Decimal::ONE + rate;
    let mut npv = Decimal::ZERO;
    let mut derivative = Decimal::ZERO;

    for flow in flows {
        let t = Decimal::from((flow.date - epoch).num_days()) / DAYS_PER_YEAR;
        let Some(discount) = base.checked_powd(t) else {
            continue;
        };
        if discount.is_zero() {
            continue;
        }
        let present = flow.amount.checked_div(discount)?;
        npv = npv.checked_add(present)?;
        let slope = present.checked_mul(t)?.checked_div(base)?;
        derivative = derivative.checked_sub(slope)?;
    }

    Some((npv, derivative))
}
