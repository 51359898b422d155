pub mod builder;
pub mod cache_key;
pub mod catalog;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod quota;
mod tenants;
pub mod ttl;
pub mod verifier;

pub use builder::ContentGatewayBuilder;
pub use catalog::{AccessContext, CatalogCache};
pub use error::GatewayError;
pub use gateway::{AccessGrant, ContentGateway};
pub use metrics::{GatewayMetrics, MetricsSnapshot};
pub use quota::{Admission, AdmissionOutcome, QuotaGate};
pub use ttl::{CacheTtlConfig, TtlClass};
pub use verifier::CredentialVerifier;
