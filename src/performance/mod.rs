pub mod performance_errors;
pub mod performance_model;
pub mod performance_service;

pub use performance_errors::*;
pub use performance_model::*;
pub use performance_service::*;
