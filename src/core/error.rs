//! Error types for the analytics engine

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// A single contract failed validation. Fatal to that contract only;
    /// siblings in the same snapshot are unaffected.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Two contracts collided on (expiry, strike, type) within one snapshot.
    /// Fatal to the whole snapshot: signals an upstream data defect.
    #[error("Duplicate contract key: {0}")]
    DuplicateKey(String),

    /// A snapshot arrived at or before the last ingested timestamp for its
    /// underlying. Incremental aggregation requires strictly increasing time.
    #[error("Out-of-order snapshot for {underlying}: {timestamp} <= {last}")]
    OutOfOrderSnapshot {
        underlying: String,
        timestamp: DateTime<Utc>,
        last: DateTime<Utc>,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn duplicate_key(msg: impl Into<String>) -> Self {
        Self::DuplicateKey(msg.into())
    }
}
