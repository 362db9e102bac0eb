//! Host environment and ledger
//!
//! The interpreter only ever reads through [`Host`]. Writes are collected in
//! a journal and handed to [`Ledger::commit`] once a swap finished, so a
//! fault anywhere in the run leaves the ledger untouched.

use std::collections::HashMap;

use primitive_types::U256;
use tracing::debug;

use crate::delegate::ContinuationDelegate;
use crate::error::{Result, VmError};
use crate::journal::{Effect, StorageKey};
use crate::types::Address;

/// Read-only view of the environment a program runs in
pub trait Host {
    /// Current unix time in seconds
    fn timestamp(&self) -> u64;

    /// Committed storage value, `None` when never written
    fn load(&self, key: &StorageKey) -> Option<U256>;

    /// Delegate registered at `address`
    fn delegate(&self, address: &Address) -> Option<&dyn ContinuationDelegate>;
}

/// A host that can durably apply the effects of a successful swap
pub trait Ledger: Host {
    /// Apply all effects or none of them
    fn commit(&mut self, effects: Vec<Effect>) -> Result<()>;
}

/// In-memory ledger: storage slots, token balances, clock and delegates
#[derive(Default)]
pub struct MemoryLedger {
    timestamp: u64,
    storage: HashMap<StorageKey, U256>,
    balances: HashMap<(Address, Address), U256>,
    delegates: HashMap<Address, Box<dyn ContinuationDelegate>>,
}

impl MemoryLedger {
    pub fn new(timestamp: u64) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    pub fn store(&mut self, key: StorageKey, value: U256) {
        self.storage.insert(key, value);
    }

    pub fn stored(&self, key: &StorageKey) -> Option<U256> {
        self.storage.get(key).copied()
    }

    /// Credit `amount` of `token` to `holder`
    pub fn fund(&mut self, token: Address, holder: Address, amount: U256) {
        let balance = self.balances.entry((token, holder)).or_default();
        *balance = balance.saturating_add(amount);
    }

    pub fn balance_of(&self, token: &Address, holder: &Address) -> U256 {
        self.balances
            .get(&(*token, *holder))
            .copied()
            .unwrap_or_default()
    }

    pub fn register_delegate(&mut self, address: Address, delegate: Box<dyn ContinuationDelegate>) {
        self.delegates.insert(address, delegate);
    }
}

impl Host for MemoryLedger {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn load(&self, key: &StorageKey) -> Option<U256> {
        self.storage.get(key).copied()
    }

    fn delegate(&self, address: &Address) -> Option<&dyn ContinuationDelegate> {
        self.delegates.get(address).map(|d| d.as_ref())
    }
}

impl Ledger for MemoryLedger {
    fn commit(&mut self, effects: Vec<Effect>) -> Result<()> {
        // stage on copies, swap in only when every effect applied
        let mut storage = self.storage.clone();
        let mut balances = self.balances.clone();

        for effect in &effects {
            match effect {
                Effect::Store { key, value } => {
                    storage.insert(*key, *value);
                }
                Effect::Transfer { token, from, to, amount } => {
                    let available = balances.get(&(*token, *from)).copied().unwrap_or_default();
                    if available < *amount {
                        return Err(VmError::InsufficientBalance {
                            token: *token,
                            holder: *from,
                            requested: *amount,
                            available,
                        });
                    }
                    balances.insert((*token, *from), available - *amount);
                    let credited = balances.entry((*token, *to)).or_default();
                    *credited = credited.saturating_add(*amount);
                }
            }
        }

        debug!(effects = effects.len(), "committed journal");
        self.storage = storage;
        self.balances = balances;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: Address = [1; 20];
    const ALICE: Address = [2; 20];
    const BOB: Address = [3; 20];

    fn bit(index: u32) -> StorageKey {
        StorageKey::Bit { maker: ALICE, index }
    }

    #[test]
    fn test_commit_applies_everything() {
        let mut ledger = MemoryLedger::new(100);
        ledger.fund(TOKEN, ALICE, U256::from(50));

        ledger
            .commit(vec![
                Effect::Store { key: bit(1), value: U256::one() },
                Effect::Transfer { token: TOKEN, from: ALICE, to: BOB, amount: U256::from(20) },
            ])
            .unwrap();

        assert_eq!(ledger.stored(&bit(1)), Some(U256::one()));
        assert_eq!(ledger.balance_of(&TOKEN, &ALICE), U256::from(30));
        assert_eq!(ledger.balance_of(&TOKEN, &BOB), U256::from(20));
    }

    #[test]
    fn test_failed_commit_leaves_no_trace() {
        let mut ledger = MemoryLedger::new(100);
        ledger.fund(TOKEN, ALICE, U256::from(10));

        let err = ledger
            .commit(vec![
                Effect::Store { key: bit(1), value: U256::one() },
                Effect::Transfer { token: TOKEN, from: ALICE, to: BOB, amount: U256::from(11) },
            ])
            .unwrap_err();

        assert!(matches!(err, VmError::InsufficientBalance { .. }));
        assert_eq!(ledger.stored(&bit(1)), None);
        assert_eq!(ledger.balance_of(&TOKEN, &ALICE), U256::from(10));
        assert!(ledger.balance_of(&TOKEN, &BOB).is_zero());
    }

    #[test]
    fn test_host_view() {
        let mut ledger = MemoryLedger::new(7);
        ledger.store(bit(3), U256::one());
        ledger.set_timestamp(9);

        assert_eq!(Host::timestamp(&ledger), 9);
        assert_eq!(Host::load(&ledger, &bit(3)), Some(U256::one()));
        assert!(ledger.delegate(&[0; 20]).is_none());
    }
}
