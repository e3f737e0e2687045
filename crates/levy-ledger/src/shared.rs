use std::sync::Arc;

use parking_lot::RwLock;

use crate::account::AccountId;
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::Amount;

/// Cloneable handle that serializes mutations on one ledger.
///
/// Mutations hold the write lock for the whole operation; queries share the
/// read lock and therefore only ever see fully applied operations.
#[derive(Clone, Debug)]
pub struct SharedLedger {
    inner: Arc<RwLock<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// Run a read-only query.
    pub fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run one mutating operation under the write lock.
    pub fn apply<R>(
        &self,
        f: impl FnOnce(&mut Ledger) -> Result<R, LedgerError>,
    ) -> Result<R, LedgerError> {
        f(&mut self.inner.write())
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.read(|l| l.balance_of(account))
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.read(|l| l.allowance(owner, spender))
    }

    pub fn transfer(
        &self,
        caller: AccountId,
        to: AccountId,
        value: Amount,
    ) -> Result<bool, LedgerError> {
        self.apply(|l| l.transfer(caller, to, value))
    }

    /// Clone the current state out of the lock.
    pub fn snapshot_state(&self) -> Ledger {
        self.inner.read().clone()
    }

    pub fn into_inner(self) -> Result<Ledger, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(lock) => Ok(lock.into_inner()),
            Err(inner) => Err(Self { inner }),
        }
    }
}
