use thiserror::Error;

use crate::account::AccountId;
use crate::Amount;

/// Every way a ledger operation can be rejected.
///
/// A rejected operation never leaves partial state behind, so callers may
/// fix the violated precondition and try again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Caller is not the ledger owner.
    #[error("account {caller} is not authorized for this operation")]
    Unauthorized { caller: AccountId },

    /// Value-moving operations are disabled while the ledger is paused.
    #[error("ledger is paused")]
    Paused,

    #[error("insufficient balance in account {account}: has {available}, needs {required}")]
    InsufficientBalance {
        account: AccountId,
        available: Amount,
        required: Amount,
    },

    #[error("allowance of {spender} over {owner} is {available}, needs {required}")]
    AllowanceExceeded {
        owner: AccountId,
        spender: AccountId,
        available: Amount,
        required: Amount,
    },

    /// The sink cannot be named as a transfer recipient.
    #[error("invalid recipient {0}")]
    InvalidRecipient(AccountId),

    /// A non-zero allowance may only be replaced after resetting it to zero.
    #[error("allowance of {spender} is {current}; reset it to zero first")]
    ResetRequired { spender: AccountId, current: Amount },

    #[error("supply cap exceeded: {requested} > {cap}")]
    CapExceeded { requested: Amount, cap: Amount },

    /// Zero or otherwise degenerate quantity.
    #[error("invalid amount: {0}")]
    InvalidAmount(&'static str),

    /// The mint rate floored to zero.
    #[error("mint rate is zero")]
    ZeroRate,

    /// Mint pricing needs a non-zero circulating supply.
    #[error("mint rate undefined while total supply is zero")]
    DivisionByZero,

    #[error("tax percent {0} is above 100")]
    InvalidTaxPercent(u8),

    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),
}
