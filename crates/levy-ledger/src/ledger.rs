use std::collections::BTreeMap;

use log::{debug, warn};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::commitment::{self, StateHeader};
use crate::config::{LedgerConfig, SnapshotPolicy};
use crate::error::LedgerError;
use crate::event::LedgerEvent;
use crate::snapshot::SnapshotBook;
use crate::{Amount, DECIMALS};

/// Balance changes staged against a ledger before they are committed.
///
/// Reads fall through to the committed balances, so debits and credits that
/// name the same account compose in order.
struct Staged<'a> {
    base: &'a BTreeMap<AccountId, Amount>,
    touched: BTreeMap<AccountId, Amount>,
}

impl<'a> Staged<'a> {
    fn new(base: &'a BTreeMap<AccountId, Amount>) -> Self {
        Self {
            base,
            touched: BTreeMap::new(),
        }
    }

    fn balance(&self, account: &AccountId) -> Amount {
        self.touched
            .get(account)
            .or_else(|| self.base.get(account))
            .copied()
            .unwrap_or(0)
    }

    fn debit(&mut self, account: AccountId, amount: Amount) -> Result<(), LedgerError> {
        let available = self.balance(&account);
        let next = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                account,
                available,
                required: amount,
            })?;
        self.touched.insert(account, next);
        Ok(())
    }

    fn credit(&mut self, account: AccountId, amount: Amount) -> Result<(), LedgerError> {
        let next = self
            .balance(&account)
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow("balance"))?;
        self.touched.insert(account, next);
        Ok(())
    }

    fn into_changes(self) -> BTreeMap<AccountId, Amount> {
        self.touched
    }
}

fn narrow(value: U256, what: &'static str) -> Result<Amount, LedgerError> {
    if value.bits() > 128 {
        return Err(LedgerError::ArithmeticOverflow(what));
    }
    Ok(value.low_u128())
}

/// Result of recomputing the supply invariants from raw balances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub total_supply: Amount,
    pub balance_sum: Amount,
    pub cap: Amount,
    pub accounts: usize,
}

impl AuditReport {
    pub fn conserved(&self) -> bool {
        self.balance_sum == self.total_supply
    }

    pub fn within_cap(&self) -> bool {
        self.total_supply <= self.cap
    }

    pub fn is_healthy(&self) -> bool {
        self.conserved() && self.within_cap()
    }
}

/// Single-instance token ledger.
///
/// Every mutating method validates its preconditions and computes all new
/// values before writing any field, so a returned error means nothing
/// changed. The caller identity is supplied by whoever hosts the ledger.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ledger {
    name: String,
    symbol: String,
    owner: AccountId,
    treasury: AccountId,
    total_supply: Amount,
    cap: Amount,
    tax_percent: u8,
    paused: bool,
    snapshot_policy: SnapshotPolicy,
    snapshots: SnapshotBook,
    balances: BTreeMap<AccountId, Amount>,
    allowances: BTreeMap<AccountId, BTreeMap<AccountId, Amount>>,
    native_reserve: Amount,
    burned: Amount,
    events: Vec<LedgerEvent>,
}

impl Ledger {
    /// Deploy a ledger, crediting `deployer` with `initial_supply` and making
    /// it the owner.
    pub fn new(
        deployer: AccountId,
        config: LedgerConfig,
        initial_supply: Amount,
    ) -> Result<Self, LedgerError> {
        config.validate()?;
        if initial_supply > config.cap {
            return Err(LedgerError::CapExceeded {
                requested: initial_supply,
                cap: config.cap,
            });
        }
        if config.treasury.is_none() {
            warn!("no treasury configured; tax will accrue to the sink");
        }

        let mut balances = BTreeMap::new();
        balances.insert(deployer, initial_supply);
        debug!("deployed ledger owner={deployer} supply={initial_supply} cap={}", config.cap);

        Ok(Self {
            name: config.name,
            symbol: config.symbol,
            owner: deployer,
            treasury: config.treasury.unwrap_or(AccountId::SINK),
            total_supply: initial_supply,
            cap: config.cap,
            tax_percent: config.tax_percent,
            paused: false,
            snapshot_policy: config.snapshot_policy,
            snapshots: SnapshotBook::new(),
            balances,
            allowances: BTreeMap::new(),
            native_reserve: config.native_reserve,
            burned: 0,
            events: vec![LedgerEvent::Transfer {
                from: AccountId::SINK,
                to: deployer,
                amount: initial_supply,
            }],
        })
    }

    //==================== administration ====================//

    pub fn pause(&mut self, caller: AccountId) -> Result<(), LedgerError> {
        self.ensure_owner(caller, "pause")?;
        self.paused = true;
        self.events.push(LedgerEvent::Paused { by: caller });
        debug!("ledger paused by {caller}");
        Ok(())
    }

    pub fn unpause(&mut self, caller: AccountId) -> Result<(), LedgerError> {
        self.ensure_owner(caller, "unpause")?;
        self.paused = false;
        self.events.push(LedgerEvent::Unpaused { by: caller });
        debug!("ledger unpaused by {caller}");
        Ok(())
    }

    /// Open a new snapshot epoch. Balances are recorded lazily by later
    /// transfers, not here.
    pub fn snapshot(&mut self, caller: AccountId) -> Result<u64, LedgerError> {
        self.ensure_owner(caller, "snapshot")?;
        let id = self.snapshots.advance()?;
        self.events.push(LedgerEvent::Snapshot { id });
        debug!("snapshot epoch {id} opened");
        Ok(id)
    }

    pub fn set_treasury(
        &mut self,
        caller: AccountId,
        treasury: AccountId,
    ) -> Result<(), LedgerError> {
        self.ensure_owner(caller, "set_treasury")?;
        let previous = std::mem::replace(&mut self.treasury, treasury);
        self.events.push(LedgerEvent::TreasuryChanged {
            previous,
            current: treasury,
        });
        debug!("treasury {previous} -> {treasury}");
        Ok(())
    }

    pub fn set_tax_percent(&mut self, caller: AccountId, percent: u8) -> Result<(), LedgerError> {
        self.ensure_owner(caller, "set_tax_percent")?;
        if percent > 100 {
            return Err(LedgerError::InvalidTaxPercent(percent));
        }
        let previous = std::mem::replace(&mut self.tax_percent, percent);
        self.events.push(LedgerEvent::TaxChanged {
            previous,
            current: percent,
        });
        debug!("tax {previous}% -> {percent}%");
        Ok(())
    }

    //==================== supply ====================//

    /// Units a deposit would mint right now, priced against the reserve
    /// including the deposit itself.
    pub fn quote_mint(&self, deposit: Amount) -> Result<Amount, LedgerError> {
        self.price_mint(deposit).map(|(_, minted)| minted)
    }

    /// Deposit native value and mint units to `caller` at
    /// `reserve * 10^decimals / total_supply` native per unit. The deposit
    /// is only retained when the mint succeeds.
    pub fn mint(&mut self, caller: AccountId, deposit: Amount) -> Result<Amount, LedgerError> {
        self.ensure_not_paused()?;
        let (reserve, minted) = self.price_mint(deposit)?;
        let supply = self
            .total_supply
            .checked_add(minted)
            .filter(|s| *s <= self.cap)
            .ok_or(LedgerError::CapExceeded {
                requested: self.total_supply.saturating_add(minted),
                cap: self.cap,
            })?;

        let mut staged = Staged::new(&self.balances);
        staged.credit(caller, minted)?;
        let changes = staged.into_changes();

        self.balances.extend(changes);
        self.native_reserve = reserve;
        self.total_supply = supply;
        self.events.push(LedgerEvent::Transfer {
            from: AccountId::SINK,
            to: caller,
            amount: minted,
        });
        debug!("minted {minted} to {caller} for deposit {deposit}");
        Ok(minted)
    }

    /// Destroy `amount` from the caller. The tax share goes to the treasury
    /// and only the remainder leaves the supply.
    pub fn burn(&mut self, caller: AccountId, amount: Amount) -> Result<bool, LedgerError> {
        self.ensure_not_paused()?;
        self.ensure_spender(caller)?;
        self.ensure_balance(caller, amount)?;
        let (tax, net) = self.split_tax(amount)?;

        let mut staged = Staged::new(&self.balances);
        staged.debit(caller, amount)?;
        staged.credit(self.treasury, tax)?;
        let changes = staged.into_changes();
        let supply = self
            .total_supply
            .checked_sub(net)
            .ok_or(LedgerError::ArithmeticOverflow("total supply"))?;
        let burned = self
            .burned
            .checked_add(net)
            .ok_or(LedgerError::ArithmeticOverflow("burned"))?;

        self.balances.extend(changes);
        self.total_supply = supply;
        self.burned = burned;
        self.events.push(LedgerEvent::Transfer {
            from: caller,
            to: AccountId::SINK,
            amount,
        });
        debug!("burned {net} from {caller} (tax {tax})");
        Ok(true)
    }

    //==================== movement ====================//

    pub fn transfer(
        &mut self,
        caller: AccountId,
        to: AccountId,
        value: Amount,
    ) -> Result<bool, LedgerError> {
        self.ensure_not_paused()?;
        self.ensure_spender(caller)?;
        self.ensure_balance(caller, value)?;
        if to.is_sink() {
            return Err(LedgerError::InvalidRecipient(to));
        }
        let changes = self.stage_taxed_move(caller, to, value)?;

        self.record_snapshot(caller);
        self.record_snapshot(to);
        self.balances.extend(changes);
        self.events.push(LedgerEvent::Transfer {
            from: caller,
            to,
            amount: value,
        });
        debug!("transfer {value} {caller} -> {to}");
        Ok(true)
    }

    /// Grant `spender` a draw limit over the caller's balance.
    ///
    /// A non-zero grant needs the current allowance to be zero first; a zero
    /// grant resets it.
    pub fn approve(
        &mut self,
        caller: AccountId,
        spender: AccountId,
        value: Amount,
    ) -> Result<bool, LedgerError> {
        self.ensure_not_paused()?;
        self.ensure_spender(caller)?;
        self.ensure_balance(caller, value)?;
        let current = self.allowance(&caller, &spender);
        if value != 0 && current != 0 {
            return Err(LedgerError::ResetRequired { spender, current });
        }
        let next = if value == 0 {
            0
        } else {
            current
                .checked_add(value)
                .ok_or(LedgerError::ArithmeticOverflow("allowance"))?
        };

        self.allowances
            .entry(caller)
            .or_default()
            .insert(spender, next);
        self.events.push(LedgerEvent::Approval {
            owner: caller,
            spender,
            amount: value,
        });
        debug!("approve {caller} -> {spender}: {next}");
        Ok(true)
    }

    pub fn transfer_from(
        &mut self,
        caller: AccountId,
        from: AccountId,
        to: AccountId,
        value: Amount,
    ) -> Result<bool, LedgerError> {
        self.ensure_not_paused()?;
        self.ensure_spender(from)?;
        self.ensure_balance(from, value)?;
        let allowed = self.allowance(&from, &caller);
        if allowed < value {
            return Err(LedgerError::AllowanceExceeded {
                owner: from,
                spender: caller,
                available: allowed,
                required: value,
            });
        }
        let changes = self.stage_taxed_move(from, to, value)?;

        self.record_snapshot(from);
        self.record_snapshot(to);
        self.balances.extend(changes);
        self.allowances
            .entry(from)
            .or_default()
            .insert(caller, allowed - value);
        self.events.push(LedgerEvent::Transfer {
            from,
            to,
            amount: value,
        });
        debug!("transfer_from {value} {from} -> {to} by {caller}");
        Ok(true)
    }

    //==================== queries ====================//

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        DECIMALS
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn cap(&self) -> Amount {
        self.cap
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn current_snapshot_id(&self) -> u64 {
        self.snapshots.current_id()
    }

    pub fn snapshot_policy(&self) -> SnapshotPolicy {
        self.snapshot_policy
    }

    pub fn tax_percent(&self) -> u8 {
        self.tax_percent
    }

    pub fn treasury(&self) -> AccountId {
        self.treasury
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn native_reserve(&self) -> Amount {
        self.native_reserve
    }

    /// Units destroyed by `burn` so far.
    pub fn burned(&self) -> Amount {
        self.burned
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Balance recorded for `account` under epoch `id`, or zero when no
    /// transfer touched the account during that epoch.
    pub fn snapshot_balance_of(&self, id: u64, account: &AccountId) -> Amount {
        self.snapshots.balance_of(id, account)
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn state_root(&self) -> [u8; 32] {
        let header = StateHeader {
            owner: self.owner,
            treasury: self.treasury,
            total_supply: self.total_supply,
            cap: self.cap,
            tax_percent: self.tax_percent,
            paused: self.paused,
            snapshot_id: self.snapshots.current_id(),
            native_reserve: self.native_reserve,
        };
        commitment::state_root(&header, &self.balances, &self.allowances)
    }

    pub fn audit(&self) -> AuditReport {
        AuditReport {
            total_supply: self.total_supply,
            balance_sum: self
                .balances
                .values()
                .fold(0u128, |acc, b| acc.saturating_add(*b)),
            cap: self.cap,
            accounts: self.balances.values().filter(|b| **b != 0).count(),
        }
    }

    //==================== internals ====================//

    fn ensure_owner(&self, caller: AccountId, op: &str) -> Result<(), LedgerError> {
        if caller != self.owner {
            warn!("rejected {op} from non-owner {caller}");
            return Err(LedgerError::Unauthorized { caller });
        }
        Ok(())
    }

    fn ensure_not_paused(&self) -> Result<(), LedgerError> {
        if self.paused {
            return Err(LedgerError::Paused);
        }
        Ok(())
    }

    /// The sink only ever receives; whatever lands there stays there.
    fn ensure_spender(&self, account: AccountId) -> Result<(), LedgerError> {
        if account.is_sink() {
            return Err(LedgerError::Unauthorized { caller: account });
        }
        Ok(())
    }

    fn ensure_balance(&self, account: AccountId, required: Amount) -> Result<(), LedgerError> {
        let available = self.balance_of(&account);
        if available < required {
            return Err(LedgerError::InsufficientBalance {
                account,
                available,
                required,
            });
        }
        Ok(())
    }

    /// `(tax, net)` with the tax floored.
    fn split_tax(&self, value: Amount) -> Result<(Amount, Amount), LedgerError> {
        let tax = value
            .checked_mul(Amount::from(self.tax_percent))
            .ok_or(LedgerError::ArithmeticOverflow("tax"))?
            / 100;
        let net = value
            .checked_sub(tax)
            .ok_or(LedgerError::InvalidTaxPercent(self.tax_percent))?;
        Ok((tax, net))
    }

    fn stage_taxed_move(
        &self,
        from: AccountId,
        to: AccountId,
        value: Amount,
    ) -> Result<BTreeMap<AccountId, Amount>, LedgerError> {
        let (tax, net) = self.split_tax(value)?;
        let mut staged = Staged::new(&self.balances);
        staged.debit(from, value)?;
        staged.credit(to, net)?;
        staged.credit(self.treasury, tax)?;
        Ok(staged.into_changes())
    }

    fn record_snapshot(&mut self, account: AccountId) {
        let balance = self.balance_of(&account);
        self.snapshots.record(self.snapshot_policy, account, balance);
    }

    /// `(reserve_after_deposit, minted)` for a deposit.
    fn price_mint(&self, deposit: Amount) -> Result<(Amount, Amount), LedgerError> {
        if deposit == 0 {
            return Err(LedgerError::InvalidAmount("deposit must be non-zero"));
        }
        let reserve = self
            .native_reserve
            .checked_add(deposit)
            .ok_or(LedgerError::ArithmeticOverflow("native reserve"))?;
        if self.total_supply == 0 {
            return Err(LedgerError::DivisionByZero);
        }
        // reserve * 10^18 outgrows u128 at a few hundred whole units
        let rate = U256::from(reserve)
            .checked_mul(U256::exp10(usize::from(DECIMALS)))
            .ok_or(LedgerError::ArithmeticOverflow("mint rate"))?
            / U256::from(self.total_supply);
        if rate.is_zero() {
            return Err(LedgerError::ZeroRate);
        }
        let minted = narrow(U256::from(deposit) / rate, "minted units")?;
        if minted == 0 {
            return Err(LedgerError::InvalidAmount("deposit buys less than one unit"));
        }
        Ok((reserve, minted))
    }
}
