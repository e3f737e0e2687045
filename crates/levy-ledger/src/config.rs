use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::error::LedgerError;
use crate::{Amount, DECIMALS};

/// Default cap: one billion whole units.
pub const DEFAULT_CAP: Amount = 1_000_000_000 * 10u128.pow(DECIMALS as u32);
pub const DEFAULT_TAX_PERCENT: u8 = 2;

/// How a transfer records pre-mutation balances into the current snapshot
/// epoch.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPolicy {
    /// Every qualifying transfer rewrites the entry, so only the balance
    /// before the most recent mutation in the epoch survives.
    #[default]
    Overwrite,
    /// Only the first mutation in an epoch writes the entry.
    FirstWrite,
}

/// Deployment parameters for a ledger instance.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub name: String,
    pub symbol: String,
    pub cap: Amount,
    pub tax_percent: u8,
    /// Tax recipient. Tax accrues to the sink when unset.
    pub treasury: Option<AccountId>,
    pub snapshot_policy: SnapshotPolicy,
    /// Native value already held by the ledger before the first mint.
    pub native_reserve: Amount,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            name: "Levy".to_string(),
            symbol: "LEVY".to_string(),
            cap: DEFAULT_CAP,
            tax_percent: DEFAULT_TAX_PERCENT,
            treasury: None,
            snapshot_policy: SnapshotPolicy::default(),
            native_reserve: 0,
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.tax_percent > 100 {
            return Err(LedgerError::InvalidTaxPercent(self.tax_percent));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: LedgerConfig =
            serde_json::from_str(r#"{ "cap": 1000, "snapshot_policy": "first_write" }"#).unwrap();
        assert_eq!(cfg.cap, 1000);
        assert_eq!(cfg.snapshot_policy, SnapshotPolicy::FirstWrite);
        assert_eq!(cfg.tax_percent, DEFAULT_TAX_PERCENT);
        assert_eq!(cfg.symbol, "LEVY");
        assert!(cfg.treasury.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed = serde_json::from_str::<LedgerConfig>(r#"{ "decimals": 6 }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn tax_above_one_hundred_is_invalid() {
        let cfg = LedgerConfig {
            tax_percent: 101,
            ..LedgerConfig::default()
        };
        assert_eq!(cfg.validate(), Err(LedgerError::InvalidTaxPercent(101)));
        let cfg = LedgerConfig {
            tax_percent: 100,
            ..LedgerConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
