//! The module contains the errors the engine can return.
//!
//! Variants fall in three groups:
//!
//! - validation: [`InvalidAmount`], [`InvalidAccount`], [`InvalidPage`], raised
//!   before any storage interaction;
//! - domain: [`NotFound`], [`InsufficientFunds`] and [`BalanceOverflow`],
//!   expected outcomes that never leave state behind;
//! - infrastructure: [`Storage`] and [`Inconsistent`]; the atomic unit is
//!   rolled back before either is returned.
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidAccount`]: EngineError::InvalidAccount
//!  [`InvalidPage`]: EngineError::InvalidPage
//!  [`NotFound`]: EngineError::NotFound
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
//!  [`BalanceOverflow`]: EngineError::BalanceOverflow
//!  [`Storage`]: EngineError::Storage
//!  [`Inconsistent`]: EngineError::Inconsistent
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid account: {0}")]
    InvalidAccount(String),
    #[error("Invalid page: {0}")]
    InvalidPage(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("account {account_id} has not enough funds")]
    InsufficientFunds { account_id: i64 },
    #[error("account {account_id} balance would overflow")]
    BalanceOverflow { account_id: i64 },
    #[error("Ledger inconsistency: {0}")]
    Inconsistent(String),
    #[error(transparent)]
    Storage(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` for errors caused by malformed input.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount(_) | Self::InvalidAccount(_) | Self::InvalidPage(_)
        )
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidAccount(a), Self::InvalidAccount(b)) => a == b,
            (Self::InvalidPage(a), Self::InvalidPage(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (
                Self::InsufficientFunds { account_id: a },
                Self::InsufficientFunds { account_id: b },
            ) => a == b,
            (
                Self::BalanceOverflow { account_id: a },
                Self::BalanceOverflow { account_id: b },
            ) => a == b,
            (Self::Inconsistent(a), Self::Inconsistent(b)) => a == b,
            (Self::Storage(a), Self::Storage(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
