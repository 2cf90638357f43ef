//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid chunk reference: {0}")]
    InvalidChunkRef(String),

    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("invalid restore tier: {0}")]
    InvalidTier(String),

    #[error("invalid retention days: {days} (must be at least {min})")]
    InvalidRetention { days: i64, min: u32 },

    #[error("invalid matcher expression: {0}")]
    InvalidMatcher(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
