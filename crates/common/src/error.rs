//! Error types shared across the flagship crates

use std::result;
use thiserror::Error;

/// Common result type used throughout the workspace
pub type Result<T> = result::Result<T, Error>;

/// Category of a failure, independent of the crate that raised it.
///
/// Callers (the CLI, an API layer) branch on this instead of matching the
/// nested per-crate enums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input or a duplicate record
    Validation,
    /// Unknown flagship, plan, fund or wallet
    NotFound,
    /// Operation not valid for the current status or time window
    State,
    /// Caller lacks the required role
    Authorization,
    /// A fund cannot cover a disbursement
    InsufficientFunds,
    /// A personal wallet cannot cover a contribution
    InsufficientBalance,
    /// Storage, serialization or configuration failure
    Internal,
}

/// Workspace-wide error type
#[derive(Error, Debug)]
pub enum Error {
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid state transition or timing
    #[error("State error: {0}")]
    State(String),

    /// Unauthorized error
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient fund balance
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Insufficient personal balance
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a new not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create a new state error
    pub fn state<S: Into<String>>(msg: S) -> Self {
        Error::State(msg.into())
    }

    /// Create a new unauthorized error
    pub fn unauthorized<S: Into<String>>(msg: S) -> Self {
        Error::Unauthorized(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// The category this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::State(_) => ErrorKind::State,
            Error::Unauthorized(_) => ErrorKind::Authorization,
            Error::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            Error::InsufficientBalance(_) => ErrorKind::InsufficientBalance,
            Error::Internal(_) | Error::Io(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::validation("bad").kind(), ErrorKind::Validation);
        assert_eq!(Error::not_found("plan-1").kind(), ErrorKind::NotFound);
        assert_eq!(Error::state("closed").kind(), ErrorKind::State);
        assert_eq!(Error::unauthorized("bob").kind(), ErrorKind::Authorization);
        assert_eq!(Error::internal("disk").kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_error_display() {
        let err = Error::InsufficientFunds("pool holds 10".to_string());
        assert_eq!(err.to_string(), "Insufficient funds: pool holds 10");
    }
}
