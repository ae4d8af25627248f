pub mod error;
pub mod forecast_store;
