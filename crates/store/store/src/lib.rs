pub mod cache;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod testing;

pub use cache::CacheStore;
pub use directory::TenantDirectory;
pub use error::StoreError;
pub use ledger::{InsertOutcome, UsageLedger};
