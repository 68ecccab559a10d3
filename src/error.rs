//! Error types for Stryde.
//!
//! Stryde uses a hierarchical error system:
//! - `StrydeError` is the top-level error returned by all public APIs
//! - Specific error types (`StorageError`, `ValidationError`) provide detail
//!
//! Two domain outcomes are deliberately *not* errors: a duplicate one-time
//! reward returns [`RewardOutcome::AlreadyGranted`](crate::xp::RewardOutcome)
//! (an expected, frequent signal), and a lost compare-and-swap race is
//! retried internally before `Conflict` is ever surfaced.
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use stryde::{Stryde, Config, Result};
//!
//! fn example() -> Result<()> {
//!     let engine = Stryde::open("./stryde.db", Config::default())?;
//!     // ... operations that may fail ...
//!     engine.close()?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::types::LearnerId;

/// Result type alias for Stryde operations.
pub type Result<T> = std::result::Result<T, StrydeError>;

/// Top-level error enum for all Stryde operations.
///
/// This is the only error type returned by public APIs.
/// Use pattern matching to handle specific error cases.
#[derive(Debug, Error)]
pub enum StrydeError {
    /// Storage layer error (I/O, corruption, transactions).
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration error.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of what's wrong with the configuration.
        reason: String,
    },

    /// Requested entity not found.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// General I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Heart spend attempted with zero hearts after regeneration.
    ///
    /// Surfaced so the caller can block the action or offer a refill path.
    /// No state changes when this is returned.
    #[error("Hearts exhausted for learner {learner}")]
    HeartsExhausted {
        /// The learner whose hearts ran out.
        learner: LearnerId,
    },

    /// A conditional update lost its race and retries were exhausted.
    ///
    /// The whole event application is safe to retry: one-time rewards are
    /// idempotent and XP/heart changes are recomputed from current state.
    #[error("Concurrent update conflict for learner {learner}")]
    Conflict {
        /// The learner whose record was contended.
        learner: LearnerId,
    },
}

impl StrydeError {
    /// Creates a configuration error with the given reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Creates a hearts-exhausted error for the given learner.
    pub fn hearts_exhausted(learner: LearnerId) -> Self {
        Self::HeartsExhausted { learner }
    }

    /// Creates a concurrency conflict error for the given learner.
    pub fn conflict(learner: LearnerId) -> Self {
        Self::Conflict { learner }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a storage error.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this is a hearts-exhausted error.
    pub fn is_hearts_exhausted(&self) -> bool {
        matches!(self, Self::HeartsExhausted { .. })
    }

    /// Returns true if this is a concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Storage-related errors.
///
/// These errors indicate problems with the underlying storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database file or data is corrupted.
    #[error("Database corrupted: {0}")]
    Corrupted(String),

    /// Database is locked by another process.
    #[error("Database is locked by another writer")]
    DatabaseLocked,

    /// Transaction failed (commit, rollback, etc.).
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error from the redb storage engine.
    #[error("Storage engine error: {0}")]
    Redb(String),

    /// Database schema version doesn't match expected version.
    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch {
        /// Expected schema version.
        expected: u32,
        /// Actual schema version found in database.
        found: u32,
    },
}

impl StorageError {
    /// Creates a corruption error with the given message.
    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::Corrupted(msg.into())
    }

    /// Creates a transaction error with the given message.
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// Creates a serialization error with the given message.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates a redb error with the given message.
    pub fn redb(msg: impl Into<String>) -> Self {
        Self::Redb(msg.into())
    }
}

// Conversions from redb error types
impl From<redb::Error> for StorageError {
    fn from(err: redb::Error) -> Self {
        StorageError::Redb(err.to_string())
    }
}

impl From<redb::DatabaseError> for StorageError {
    fn from(err: redb::DatabaseError) -> Self {
        StorageError::Redb(err.to_string())
    }
}

impl From<redb::TransactionError> for StorageError {
    fn from(err: redb::TransactionError) -> Self {
        StorageError::Transaction(err.to_string())
    }
}

impl From<redb::CommitError> for StorageError {
    fn from(err: redb::CommitError) -> Self {
        StorageError::Transaction(format!("Commit failed: {}", err))
    }
}

impl From<redb::TableError> for StorageError {
    fn from(err: redb::TableError) -> Self {
        StorageError::Redb(format!("Table error: {}", err))
    }
}

impl From<redb::StorageError> for StorageError {
    fn from(err: redb::StorageError) -> Self {
        StorageError::Redb(format!("Storage error: {}", err))
    }
}

// Convert bincode errors to StorageError
impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

// Also allow direct conversion to StrydeError for convenience
impl From<redb::Error> for StrydeError {
    fn from(err: redb::Error) -> Self {
        StrydeError::Storage(StorageError::from(err))
    }
}

impl From<redb::DatabaseError> for StrydeError {
    fn from(err: redb::DatabaseError) -> Self {
        StrydeError::Storage(StorageError::from(err))
    }
}

impl From<redb::TransactionError> for StrydeError {
    fn from(err: redb::TransactionError) -> Self {
        StrydeError::Storage(StorageError::from(err))
    }
}

impl From<redb::CommitError> for StrydeError {
    fn from(err: redb::CommitError) -> Self {
        StrydeError::Storage(StorageError::from(err))
    }
}

impl From<redb::TableError> for StrydeError {
    fn from(err: redb::TableError) -> Self {
        StrydeError::Storage(StorageError::from(err))
    }
}

impl From<redb::StorageError> for StrydeError {
    fn from(err: redb::StorageError) -> Self {
        StrydeError::Storage(StorageError::from(err))
    }
}

impl From<bincode::Error> for StrydeError {
    fn from(err: bincode::Error) -> Self {
        StrydeError::Storage(StorageError::from(err))
    }
}

/// Validation errors for input data.
///
/// These errors indicate problems with data provided by the caller.
/// Validation happens before any mutation, so a validation failure
/// never leaves partial state behind.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A field has an invalid value.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        /// Name of the invalid field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// A required field is missing or empty.
    #[error("Required field missing: {field}")]
    RequiredField {
        /// Name of the missing field.
        field: String,
    },

    /// An amount field that must be non-negative was negative.
    #[error("Negative amount in '{field}': {value}")]
    NegativeAmount {
        /// Name of the field.
        field: String,
        /// The offending value.
        value: i64,
    },

    /// A string field exceeds its maximum length.
    #[error("Field '{field}' too long: {len} chars (max: {max})")]
    FieldTooLong {
        /// Name of the field.
        field: String,
        /// Actual length in chars.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// Quest identifier not present in the configured catalog.
    #[error("Unknown quest: {0}")]
    UnknownQuest(String),

    /// Achievement identifier not present in the configured catalog.
    #[error("Unknown achievement: {0}")]
    UnknownAchievement(String),
}

impl ValidationError {
    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a required field error.
    pub fn required_field(field: impl Into<String>) -> Self {
        Self::RequiredField {
            field: field.into(),
        }
    }

    /// Creates a negative amount error.
    pub fn negative_amount(field: impl Into<String>, value: i64) -> Self {
        Self::NegativeAmount {
            field: field.into(),
            value,
        }
    }

    /// Creates a field too long error.
    pub fn field_too_long(field: impl Into<String>, len: usize, max: usize) -> Self {
        Self::FieldTooLong {
            field: field.into(),
            len,
            max,
        }
    }

    /// Creates an unknown quest error.
    pub fn unknown_quest(id: impl ToString) -> Self {
        Self::UnknownQuest(id.to_string())
    }

    /// Creates an unknown achievement error.
    pub fn unknown_achievement(id: impl ToString) -> Self {
        Self::UnknownAchievement(id.to_string())
    }
}

/// Not found errors for specific entity types.
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// Learner with given ID not found.
    #[error("Learner not found: {0}")]
    Learner(String),

    /// Quest not assigned to the learner.
    #[error("Quest assignment not found: {0}")]
    Assignment(String),

    /// League standing not found for given learner/season pair.
    #[error("League standing not found: {0}")]
    Standing(String),
}

impl NotFoundError {
    /// Creates a learner not found error.
    pub fn learner(id: impl ToString) -> Self {
        Self::Learner(id.to_string())
    }

    /// Creates a quest assignment not found error.
    pub fn assignment(id: impl ToString) -> Self {
        Self::Assignment(id.to_string())
    }

    /// Creates a league standing not found error.
    pub fn standing(id: impl ToString) -> Self {
        Self::Standing(id.to_string())
    }
}
