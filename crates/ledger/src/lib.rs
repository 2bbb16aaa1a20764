//! Fund ledger for the flagship governance engine
//!
//! Owns the two pool balances (`Reserve` and `Pool`), the immutable
//! contribution and disbursement records, and the members' personal wallets
//! that Pool contributions are drawn from. Wallets live in the same
//! [`LedgerBook`] as the funds so that a member debit and the matching Pool
//! credit commit in one transaction.

use thiserror::Error;

use flagship_storage::StorageError;

pub mod book;
pub mod service;
pub mod types;

pub use book::LedgerBook;
pub use service::{FundLedger, HasLedger};
pub use types::{
    Contribution, Disbursement, Fund, FundAudit, FundSummary, FundType, Wallet,
};

/// Error types for ledger operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// Amount was zero, negative, or otherwise unusable
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// A member's personal wallet cannot cover a contribution
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// A fund cannot cover a disbursement
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// The fund has never been capitalized
    #[error("Fund not found: {0}")]
    FundNotFound(String),

    /// Error with storage
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for LedgerError {
    fn from(err: StorageError) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

impl From<LedgerError> for flagship_common::Error {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidAmount(msg) => flagship_common::Error::validation(msg),
            LedgerError::InsufficientBalance(msg) => flagship_common::Error::InsufficientBalance(msg),
            LedgerError::InsufficientFunds(msg) => flagship_common::Error::InsufficientFunds(msg),
            LedgerError::FundNotFound(msg) => flagship_common::Error::not_found(msg),
            LedgerError::Storage(msg) => flagship_common::Error::internal(msg),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
