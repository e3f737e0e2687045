//! Property tests over random operation sequences.
//!
//! Properties checked after every step:
//! - sum of all balances equals total supply
//! - total supply never exceeds the cap
//! - a rejected operation leaves the ledger byte-for-byte unchanged
//! - while paused, every value-moving call is rejected with `Paused`

use levy_ledger::{AccountId, Amount, Ledger, LedgerConfig, LedgerError};
use proptest::prelude::*;

const OWNER: AccountId = AccountId::new([0x01; 20]);
const CAP: Amount = 50_000_000_000_000_000_000_000;

fn account(idx: u8) -> AccountId {
    match idx {
        0 => OWNER,
        1 => AccountId::SINK,
        n => AccountId::new([n; 20]),
    }
}

#[derive(Debug, Clone)]
enum Op {
    Pause,
    Unpause,
    Snapshot,
    Mint { caller: u8, deposit: Amount },
    Burn { caller: u8, amount: Amount },
    Transfer { caller: u8, to: u8, value: Amount },
    Approve { caller: u8, spender: u8, value: Amount },
    TransferFrom { caller: u8, from: u8, to: u8, value: Amount },
    SetTax { percent: u8 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let who = 0u8..6;
    prop_oneof![
        1 => Just(Op::Pause),
        2 => Just(Op::Unpause),
        1 => Just(Op::Snapshot),
        2 => (who.clone(), 1u128..5_000_000_000).prop_map(|(caller, deposit)| Op::Mint { caller, deposit }),
        2 => (who.clone(), 0u128..2_000_000).prop_map(|(caller, amount)| Op::Burn { caller, amount }),
        6 => (who.clone(), who.clone(), 0u128..5_000_000)
            .prop_map(|(caller, to, value)| Op::Transfer { caller, to, value }),
        3 => (who.clone(), who.clone(), 0u128..3_000_000)
            .prop_map(|(caller, spender, value)| Op::Approve { caller, spender, value }),
        4 => (who.clone(), who.clone(), who, 0u128..3_000_000)
            .prop_map(|(caller, from, to, value)| Op::TransferFrom { caller, from, to, value }),
        1 => (0u8..=100).prop_map(|percent| Op::SetTax { percent }),
    ]
}

fn apply(ledger: &mut Ledger, op: &Op) -> Result<(), LedgerError> {
    match *op {
        Op::Pause => ledger.pause(OWNER),
        Op::Unpause => ledger.unpause(OWNER),
        Op::Snapshot => ledger.snapshot(OWNER).map(|_| ()),
        Op::Mint { caller, deposit } => ledger.mint(account(caller), deposit).map(|_| ()),
        Op::Burn { caller, amount } => ledger.burn(account(caller), amount).map(|_| ()),
        Op::Transfer { caller, to, value } => {
            ledger.transfer(account(caller), account(to), value).map(|_| ())
        }
        Op::Approve {
            caller,
            spender,
            value,
        } => ledger
            .approve(account(caller), account(spender), value)
            .map(|_| ()),
        Op::TransferFrom {
            caller,
            from,
            to,
            value,
        } => ledger
            .transfer_from(account(caller), account(from), account(to), value)
            .map(|_| ()),
        Op::SetTax { percent } => ledger.set_tax_percent(OWNER, percent),
    }
}

fn moves_value(op: &Op) -> bool {
    matches!(
        op,
        Op::Mint { .. }
            | Op::Burn { .. }
            | Op::Transfer { .. }
            | Op::Approve { .. }
            | Op::TransferFrom { .. }
    )
}

fn deploy() -> Ledger {
    let config = LedgerConfig {
        cap: CAP,
        treasury: Some(AccountId::new([0x05; 20])),
        native_reserve: 40_000_000_000,
        ..LedgerConfig::default()
    };
    Ledger::new(OWNER, config, 40_000_000_000_000_000_000_000).unwrap()
}

proptest! {
    #[test]
    fn invariants_hold_over_random_sequences(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let mut ledger = deploy();
        for op in &ops {
            let before = ledger.clone();
            let was_paused = ledger.paused();
            let outcome = apply(&mut ledger, op);

            if was_paused && moves_value(op) {
                prop_assert_eq!(outcome.clone(), Err(LedgerError::Paused));
            }
            if outcome.is_err() {
                prop_assert_eq!(&ledger, &before);
            }
            prop_assert!(
                ledger.balance_of(&AccountId::SINK) >= before.balance_of(&AccountId::SINK),
                "sink balance dropped after {:?}",
                op
            );

            let report = ledger.audit();
            prop_assert!(report.conserved(), "conservation broken after {:?}: {:?}", op, report);
            prop_assert!(report.within_cap(), "cap broken after {:?}: {:?}", op, report);
        }
    }

    #[test]
    fn transfer_splits_value_exactly(value in 0u128..1_000_000, percent in 0u8..=100) {
        let mut ledger = deploy();
        ledger.set_tax_percent(OWNER, percent).unwrap();
        let to = AccountId::new([0x09; 20]);
        let treasury = ledger.treasury();
        ledger.transfer(OWNER, to, value).unwrap();

        let tax = value * Amount::from(percent) / 100;
        prop_assert_eq!(ledger.balance_of(&to), value - tax);
        prop_assert_eq!(ledger.balance_of(&treasury), tax);
    }
}
