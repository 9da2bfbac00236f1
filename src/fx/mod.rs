pub mod fx_errors;
pub mod fx_service;

pub use fx_errors::*;
pub use fx_service::*;
