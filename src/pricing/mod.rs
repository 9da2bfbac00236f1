pub mod pricing_errors;
pub mod pricing_service;
pub mod pricing_traits;

pub use pricing_errors::*;
pub use pricing_service::*;
pub use pricing_traits::*;
