use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::LedgerError;

/// Transaction types understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Buy,
    Sell,
    Deposit,
    Withdrawal,
    Dividend,
    Bonus,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => "BUY",
            TransactionType::Sell => "SELL",
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::Dividend => "DIVIDEND",
            TransactionType::Bonus => "BONUS",
        }
    }
}

impl FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(TransactionType::Buy),
            "SELL" => Ok(TransactionType::Sell),
            "DEPOSIT" => Ok(TransactionType::Deposit),
            "WITHDRAWAL" => Ok(TransactionType::Withdrawal),
            "DIVIDEND" => Ok(TransactionType::Dividend),
            "BONUS" => Ok(TransactionType::Bonus),
            other => Err(LedgerError::InvalidTransactionType(other.to_string())),
        }
    }
}

/// Immutable, append-only ledger entry.
///
/// A `Dividend` with `quantity > 0` is a stock dividend (shares added at
/// `unit_price`, usually zero); with `quantity == 0` the cash total is
/// carried in `amount`. `Deposit`/`Withdrawal` also carry their total in
/// `amount` since quantity is not meaningful for account holdings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub symbol: String,
    pub transaction_type: TransactionType,
    pub transaction_date: NaiveDate,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Option<Decimal>,
    pub fee: Decimal,
    pub currency: String,
}

impl Transaction {
    pub fn amount_or_zero(&self) -> Decimal {
        self.amount.unwrap_or(Decimal::ZERO)
    }

    /// Cash-dividend transactions carry no share quantity.
    pub fn is_cash_dividend(&self) -> bool {
        self.transaction_type == TransactionType::Dividend && self.quantity.is_zero()
    }
}
