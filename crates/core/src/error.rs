//! Ledger error model.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::amount::Amount;
use crate::id::{AccountId, FundId};

/// Result type used across the ledger domain.
pub type FundResult<T> = Result<T, FundError>;

/// Ledger-level rejection.
///
/// Every variant is a rejected operation with zero side effects. Callers branch
/// on the variant; the payload only adds context for logs and messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FundError {
    /// Caller is not the administrator (create / withdraw).
    #[error("unauthorized: {caller} is not the administrator")]
    Unauthorized { caller: AccountId },

    #[error("fund {0} not found")]
    FundNotFound(FundId),

    #[error("fund {0} already exists")]
    FundAlreadyExists(FundId),

    /// Target amount must be positive.
    #[error("invalid target amount: {0}")]
    InvalidTarget(Amount),

    #[error("fund {0} is closed")]
    FundIsClosed(FundId),

    #[error("fund {0} is open")]
    FundIsOpen(FundId),

    #[error("amount is not a positive number")]
    AmountIsNotPositiveNumber,

    /// The whole donation is rejected; it is never truncated to fit.
    #[error("donation of {amount} exceeds the {remaining} remaining to target of fund {fund_id}")]
    DonationExceedsTargetAmount {
        fund_id: FundId,
        amount: Amount,
        remaining: Amount,
    },

    #[error("amount of fund {0} is already withdrawn")]
    AmountIsAlreadyWithdrawn(FundId),

    #[error("fund {fund_id} duration not reached (deadline {deadline})")]
    FundDurationNotReached {
        fund_id: FundId,
        deadline: DateTime<Utc>,
    },

    #[error("no amount to be refunded to {contributor} from fund {fund_id}")]
    NoAmountToBeRefunded {
        fund_id: FundId,
        contributor: AccountId,
    },

    /// An identifier was invalid (e.g. parse failure, zero fund id).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// An amount could not be parsed or overflowed.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

impl FundError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn unauthorized(caller: AccountId) -> Self {
        Self::Unauthorized { caller }
    }
}
