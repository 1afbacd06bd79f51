//! Error types for tideway operations

use thiserror::Error;

/// Store layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("key not found")]
    NotFound,

    #[error("store backend failure: {reason}")]
    Backend { reason: String },

    #[error("serialization failure: {reason}")]
    Serialization { reason: String },

    #[error("sorted set is empty")]
    EmptySet,
}

/// Score extraction errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScoreError {
    #[error("score field not found: {field}")]
    FieldNotFound { field: String },

    #[error("unsupported score field: {field}")]
    UnsupportedField { field: String },
}

/// Seeder errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SeedError {
    #[error("reference item not found on source: {rid}")]
    ReferenceNotFound { rid: String },

    #[error("source failure: {reason}")]
    Source { reason: String },
}

/// Serialized-time parsing errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimeError {
    #[error("cannot parse serialized time: {value}")]
    Parse { value: String },
}

/// Master error type for all tideway operations.
#[derive(Debug, Clone, Error)]
pub enum TidewayError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("score error: {0}")]
    Score(#[from] ScoreError),

    #[error("seed error: {0}")]
    Seed(#[from] SeedError),

    #[error("time error: {0}")]
    Time(#[from] TimeError),
}

/// Result type alias for tideway operations.
pub type TidewayResult<T> = Result<T, TidewayError>;
