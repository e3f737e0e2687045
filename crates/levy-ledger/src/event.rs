use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::Amount;

/// Records appended to the ledger's event log on successful operations.
///
/// `Transfer.amount` is the gross value moved by the caller even when the
/// recipient was credited less after tax. Indexers depend on that.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },
    Approval {
        owner: AccountId,
        spender: AccountId,
        amount: Amount,
    },
    Paused {
        by: AccountId,
    },
    Unpaused {
        by: AccountId,
    },
    Snapshot {
        id: u64,
    },
    TreasuryChanged {
        previous: AccountId,
        current: AccountId,
    },
    TaxChanged {
        previous: u8,
        current: u8,
    },
}
