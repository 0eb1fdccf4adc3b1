//! The errors the engine can raise.
//!
//! Every error raised inside an open unit of work aborts it: the database
//! transaction is dropped without commit, so no partial balance write ever
//! becomes visible. The engine performs no retries of its own; a failed
//! operation can be retried by the caller because rollback is total.

use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The overdraft rule was violated: a non-credit account would end up
    /// with a negative balance. Carries the account name.
    #[error("insufficient balance on account \"{0}\"")]
    InsufficientBalance(String),
    /// The currency normalizer failed or was unavailable.
    #[error("currency conversion failed: {0}")]
    ConversionFailure(String),
    /// A referenced account, transaction or balance row does not exist.
    #[error("\"{0}\" not found")]
    NotFound(String),
    /// A unique or foreign-key constraint was violated by the store.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    /// The unit of work exceeded its wall-clock budget and was aborted.
    #[error("operation timed out: {0}")]
    Timeout(String),
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InsufficientBalance(a), Self::InsufficientBalance(b)) => a == b,
            (Self::ConversionFailure(a), Self::ConversionFailure(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::ConstraintViolation(a), Self::ConstraintViolation(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::Timeout(a), Self::Timeout(b)) => a == b,
            (Self::Configuration(a), Self::Configuration(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
