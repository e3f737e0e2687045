//! Levy token ledger.
//!
//! A single, self-contained accounting state machine for a capped token:
//!
//! * [`ledger`]: balances, allowances, transfer tax, pause switch and
//!   native-reserve priced minting.
//! * [`snapshot`]: epoch counter and lazily recorded balances.
//! * [`shared`]: a lock-protected handle for hosting the ledger behind a
//!   concurrent runtime.
//! * [`config`]: deployment parameters, deserializable from JSON.
//!
//! Every mutating operation is atomic: it either applies completely or
//! returns a [`LedgerError`] and leaves the ledger untouched.

pub mod account;
pub mod config;
pub mod event;
pub mod ledger;
pub mod shared;
pub mod snapshot;

mod commitment;
mod error;

pub use account::AccountId;
pub use config::{LedgerConfig, SnapshotPolicy};
pub use error::LedgerError;
pub use event::LedgerEvent;
pub use ledger::{AuditReport, Ledger};
pub use shared::SharedLedger;

/// Unit count type for balances, supply and native value.
pub type Amount = u128;

/// Fixed display/arithmetic scale of one whole unit.
pub const DECIMALS: u8 = 18;
