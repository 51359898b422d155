pub mod clock;
pub mod error;
pub mod media;
pub mod period;
pub mod tenant;
pub mod types;
pub mod usage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CoreError;
pub use media::MediaClass;
pub use period::PeriodKey;
pub use tenant::{BillingMode, Plan, SessionCeiling, Tenant};
pub use types::{EndUserId, TenantCode};
pub use usage::{ClientMeta, MonthlyUsageRecord, UsageKey, UsageSummary};
