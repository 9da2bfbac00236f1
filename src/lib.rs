pub mod assets;
pub mod constants;
pub mod errors;
pub mod fx;
pub mod history;
pub mod ledger;
pub mod performance;
pub mod portfolio;
pub mod positions;
pub mod pricing;

pub use errors::{Error, Result};
pub use portfolio::*;
