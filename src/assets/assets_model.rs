use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::PIVOT_CURRENCY;

/// Classification bucket used for allocation reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetType {
    Stock,
    Crypto,
    RealEstate,
    Cash,
    Currency,
    Other,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Stock => "STOCK",
            AssetType::Crypto => "CRYPTO",
            AssetType::RealEstate => "REAL_ESTATE",
            AssetType::Cash => "CASH",
            AssetType::Currency => "CURRENCY",
            AssetType::Other => "OTHER",
        }
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "STOCK" => Ok(AssetType::Stock),
            "CRYPTO" => Ok(AssetType::Crypto),
            "REAL_ESTATE" => Ok(AssetType::RealEstate),
            "CASH" => Ok(AssetType::Cash),
            "CURRENCY" => Ok(AssetType::Currency),
            "OTHER" => Ok(AssetType::Other),
            other => Err(format!("Unknown asset type: {}", other)),
        }
    }
}

/// Whether a symbol represents a per-unit security or a whole account.
///
/// For `Account` symbols the "price" returned by any lookup is the account's
/// total balance on that date, not a per-unit price. Valuation therefore does
/// not multiply by quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HoldingKind {
    Security,
    Account,
}

/// Currency-aware symbol descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolProfile {
    pub symbol: String,
    pub asset_type: AssetType,
    pub currency: String,
    /// Custom symbols are priced from user-entered manual price points
    /// rather than an external market feed.
    pub is_custom: bool,
    pub holding_kind: HoldingKind,
    /// Last known market price, if the upstream feed provides one.
    pub last_price: Option<Decimal>,
}

impl SymbolProfile {
    pub fn new(symbol: &str, asset_type: AssetType, currency: &str) -> Self {
        SymbolProfile {
            symbol: symbol.to_string(),
            asset_type,
            currency: currency.to_string(),
            is_custom: false,
            holding_kind: HoldingKind::Security,
            last_price: None,
        }
    }

    /// Synthetic descriptor for a CURRENCYUSD exchange-rate pseudo-symbol.
    pub fn currency_pair(pair_symbol: &str) -> Self {
        SymbolProfile {
            symbol: pair_symbol.to_string(),
            asset_type: AssetType::Currency,
            currency: PIVOT_CURRENCY.to_string(),
            is_custom: false,
            holding_kind: HoldingKind::Security,
            last_price: None,
        }
    }

    pub fn is_account(&self) -> bool {
        self.holding_kind == HoldingKind::Account
    }
}
