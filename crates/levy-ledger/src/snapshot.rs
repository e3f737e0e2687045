use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::config::SnapshotPolicy;
use crate::error::LedgerError;
use crate::Amount;

/// Epoch counter plus the balances recorded under each epoch id.
///
/// Taking a snapshot only advances the counter. Balances are written lazily
/// by transfers touching an account, so an account that never moved during
/// an epoch has no entry and reads back as zero.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotBook {
    current_id: u64,
    entries: BTreeMap<u64, BTreeMap<AccountId, Amount>>,
}

impl SnapshotBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_id(&self) -> u64 {
        self.current_id
    }

    /// Open the next epoch and return its id.
    pub fn advance(&mut self) -> Result<u64, LedgerError> {
        self.current_id = self
            .current_id
            .checked_add(1)
            .ok_or(LedgerError::ArithmeticOverflow("snapshot id"))?;
        Ok(self.current_id)
    }

    /// Record `balance` for `account` under the current epoch.
    pub fn record(&mut self, policy: SnapshotPolicy, account: AccountId, balance: Amount) {
        let epoch = self.entries.entry(self.current_id).or_default();
        match policy {
            SnapshotPolicy::Overwrite => {
                epoch.insert(account, balance);
            }
            SnapshotPolicy::FirstWrite => {
                epoch.entry(account).or_insert(balance);
            }
        }
    }

    pub fn recorded(&self, id: u64, account: &AccountId) -> Option<Amount> {
        self.entries.get(&id)?.get(account).copied()
    }

    pub fn balance_of(&self, id: u64, account: &AccountId) -> Amount {
        self.recorded(id, account).unwrap_or(0)
    }
}
