//! # Account State
//!
//! The chain core does not execute transactions, but it does own the
//! genesis bootstrap: on a test/bootstrap network, a fixed set of
//! faucet accounts is credited once, before the first block exists.
//! The minimal account record lives here; everything richer belongs to
//! the state-transition executor.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::config::{testnet_allocation, testnet_allocation_balance};
use crate::storage::db::{ChainDb, DbResult};

/// The on-chain state of a single account.
///
/// Consensus-critical: nodes must agree on every byte of every account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Next expected transaction nonce.
    pub nonce: u64,
    /// Balance in the smallest unit. Arbitrary precision — the genesis
    /// allocation alone overflows u128.
    pub balance: BigUint,
}

impl AccountState {
    /// A fresh account holding `balance`.
    pub fn with_balance(balance: BigUint) -> Self {
        Self { balance, nonce: 0 }
    }
}

/// Credit the fixed testnet allocation.
///
/// Called exactly once, from genesis bootstrap, and only when the store
/// holds no persisted head. Idempotent in effect: re-crediting writes
/// the same states again.
pub fn apply_testnet_allocation(db: &ChainDb) -> DbResult<()> {
    let balance = testnet_allocation_balance();
    for address in testnet_allocation() {
        db.put_account(&address, &AccountState::with_balance(balance.clone()))?;
    }
    Ok(())
}
