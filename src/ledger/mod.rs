pub mod ledger_errors;
pub mod ledger_model;
pub mod ledger_traits;

pub use ledger_errors::*;
pub use ledger_model::*;
pub use ledger_traits::*;
