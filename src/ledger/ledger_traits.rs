use async_trait::async_trait;

use super::Transaction;
use crate::assets::SymbolProfile;
use crate::errors::Result;

/// Read-only view over the transaction ledger and symbol registry.
///
/// Storage and CRUD live outside the engine; this trait is the injection
/// point for whatever backs them.
#[async_trait]
pub trait LedgerStoreTrait: Send + Sync {
    async fn get_transactions(&self, user_id: &str) -> Result<Vec<Transaction>>;
    async fn get_symbols(&self, user_id: &str) -> Result<Vec<SymbolProfile>>;
}
