//! Error taxonomy of the vote accounting core.
//!
//! Business-rule rejections (`DuplicateVote`, quota errors, payment errors)
//! are client-correctable and never retried by the server; `Conflict` is the
//! storage-level retry signal (serialization failure / deadlock) consumed by
//! the Postgres store's bounded retry loop before it surfaces here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("already voted for this word today")]
    DuplicateVote,

    #[error("daily vote limit reached")]
    DailyLimitReached,

    #[error("free votes for today are used up; retry as a paid vote")]
    FreeQuotaExhausted,

    #[error("free votes remain for today; use them before voting paid")]
    FreeQuotaNotYetUsed,

    #[error("payment reference has already been used")]
    PaymentAlreadyUsed,

    #[error("a paid vote requires a payment reference")]
    PaymentMissing,

    #[error("word already exists")]
    WordExists,

    /// Serialization failure or deadlock after retries were exhausted.
    #[error("storage conflict, please retry")]
    Conflict,

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Stable machine-readable code carried in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation_error",
            CoreError::NotFound(_) => "not_found",
            CoreError::DuplicateVote => "duplicate_vote",
            CoreError::DailyLimitReached => "daily_limit_reached",
            CoreError::FreeQuotaExhausted => "free_quota_exhausted",
            CoreError::FreeQuotaNotYetUsed => "free_quota_not_yet_used",
            CoreError::PaymentAlreadyUsed => "payment_already_used",
            CoreError::PaymentMissing => "payment_missing",
            CoreError::WordExists => "word_exists",
            CoreError::Conflict => "storage_conflict",
            CoreError::Unavailable(_) => "storage_unavailable",
            CoreError::Storage(_) => "storage_error",
        }
    }

    /// True for transient storage failures the caller may retry verbatim.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Conflict | CoreError::Unavailable(_))
    }

    /// True only for serialization failures and deadlocks. The store's
    /// transparent retry loop keys off this; an unavailable backend is
    /// surfaced to the caller immediately instead of being hammered.
    pub fn is_serialization_conflict(&self) -> bool {
        matches!(self, CoreError::Conflict)
    }
}
