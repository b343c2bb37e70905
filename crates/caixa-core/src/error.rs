use rust_decimal::Decimal;
use thiserror::Error;

/// Rejected input. Never retried; surfaced to the caller immediately.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("description must not be blank")]
    BlankDescription,

    #[error("kind or category must not be empty")]
    BlankKind,
}

/// A failed exchange with the remote backend.
///
/// These never fail a submission: the sync engine absorbs them into a
/// local-only outcome and a queued replay.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote request timed out")]
    Timeout,

    #[error("remote unreachable: {0}")]
    Network(String),

    #[error("remote rejected the request: {0}")]
    Backend(String),
}

impl RemoteError {
    /// Timeouts and transport errors may succeed on a retry; a rejection
    /// from the backend itself will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Timeout | RemoteError::Network(_))
    }
}

/// Failures surfaced to callers of the core API.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("local storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization failure: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("stored data is corrupt: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
