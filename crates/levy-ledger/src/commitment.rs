use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::account::AccountId;
use crate::Amount;

/// Scalar fields folded into the state root.
pub(crate) struct StateHeader {
    pub owner: AccountId,
    pub treasury: AccountId,
    pub total_supply: Amount,
    pub cap: Amount,
    pub tax_percent: u8,
    pub paused: bool,
    pub snapshot_id: u64,
    pub native_reserve: Amount,
}

/// Merkle root over the header, every non-zero balance and every non-zero
/// allowance. Leaves are domain separated and visited in key order.
pub(crate) fn state_root(
    header: &StateHeader,
    balances: &BTreeMap<AccountId, Amount>,
    allowances: &BTreeMap<AccountId, BTreeMap<AccountId, Amount>>,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"header");
    hasher.update(header.owner.as_bytes());
    hasher.update(header.treasury.as_bytes());
    hasher.update(header.total_supply.to_le_bytes());
    hasher.update(header.cap.to_le_bytes());
    hasher.update([header.tax_percent, header.paused as u8]);
    hasher.update(header.snapshot_id.to_le_bytes());
    hasher.update(header.native_reserve.to_le_bytes());
    let header_leaf: [u8; 32] = hasher.finalize().into();

    let mut leaves = Vec::with_capacity(balances.len());

    for (account, balance) in balances.iter().filter(|(_, b)| **b != 0) {
        let mut hasher = Sha256::new();
        hasher.update(b"acct");
        hasher.update(account.as_bytes());
        hasher.update(balance.to_le_bytes());
        leaves.push(hasher.finalize().into());
    }
    for (owner, spenders) in allowances {
        for (spender, amount) in spenders.iter().filter(|(_, a)| **a != 0) {
            let mut hasher = Sha256::new();
            hasher.update(b"allow");
            hasher.update(owner.as_bytes());
            hasher.update(spender.as_bytes());
            hasher.update(amount.to_le_bytes());
            leaves.push(hasher.finalize().into());
        }
    }
    build_merkle(header_leaf, leaves)
}

/// Pairwise fold of `first` followed by `rest`. The tree always has at least
/// one leaf.
fn build_merkle(first: [u8; 32], rest: Vec<[u8; 32]>) -> [u8; 32] {
    let mut leaves = Vec::with_capacity(1 + rest.len());
    leaves.push(first);
    leaves.extend(rest);
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity((leaves.len() + 1) / 2);
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            // odd node is paired with itself
            hasher.update(chunk.get(1).unwrap_or(&chunk[0]));
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}
