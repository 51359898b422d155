pub mod api;
pub mod cache_factory;
pub mod config;
pub mod error;
pub mod ledger_factory;
pub mod telemetry;
