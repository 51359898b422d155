pub mod config;
pub mod credentials;
pub mod error;
pub mod mock;
pub mod provider;
pub mod request;
pub mod xtream;

pub use config::UpstreamConfig;
pub use credentials::Credentials;
pub use error::UpstreamError;
pub use mock::{FailingUpstream, MockUpstream, RejectingUpstream};
pub use provider::UpstreamProvider;
pub use request::UpstreamRequest;
pub use xtream::XtreamHttpProvider;
