use thiserror::Error;

/// Errors raised while constructing or parsing core domain values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A period token that is not a valid `YYYY-MM` month.
    #[error("invalid period: {0} (expected YYYY-MM)")]
    InvalidPeriod(String),

    /// A media class name that is not one of live, movies or series.
    #[error("unknown media class: {0}")]
    UnknownMediaClass(String),

    /// A billing mode name that is not recognised.
    #[error("unknown billing mode: {0}")]
    UnknownBillingMode(String),
}
