mod config;
mod directory;
mod ledger;
pub mod migrations;
mod pool;

pub use config::PostgresConfig;
pub use directory::PostgresTenantDirectory;
pub use ledger::PostgresUsageLedger;
pub use pool::connect;
