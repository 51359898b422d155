mod cache;
mod directory;
mod ledger;
mod unavailable;

pub use cache::MemoryCacheStore;
pub use directory::MemoryTenantDirectory;
pub use ledger::MemoryUsageLedger;
pub use unavailable::{UnavailableCacheStore, UnavailableUsageLedger};
