//! Pending side effects of a swap-mode run
//!
//! Nothing touches durable state while the program executes. Instructions
//! record [`Effect`]s here and the ledger applies the whole list only after
//! the top-level run returned `Ok`; any fault drops the journal unapplied.

use crate::types::{Address, Hash};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKey {
    /// Per-order pool balance of `token`
    Balance {
        #[serde(with = "hex::serde")]
        order_hash: Hash,
        #[serde(with = "hex::serde")]
        token: Address,
    },
    /// One-shot invalidation bit of a maker
    Bit {
        #[serde(with = "hex::serde")]
        maker: Address,
        index: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    Store { key: StorageKey, value: U256 },
    Transfer {
        #[serde(with = "hex::serde")]
        token: Address,
        #[serde(with = "hex::serde")]
        from: Address,
        #[serde(with = "hex::serde")]
        to: Address,
        amount: U256,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Journal {
    effects: Vec<Effect>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Latest pending write to `key`, if any
    pub fn load(&self, key: &StorageKey) -> Option<U256> {
        self.effects.iter().rev().find_map(|e| match e {
            Effect::Store { key: k, value } if k == key => Some(*value),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn into_effects(self) -> Vec<Effect> {
        self.effects
    }

    /// Detach everything recorded after the first `at` effects
    pub fn split_off(&mut self, at: usize) -> Vec<Effect> {
        self.effects.split_off(at.min(self.effects.len()))
    }

    /// Sum of `token` transfers out of `from` recorded after the first `at` effects
    pub fn transferred_since(&self, at: usize, token: &Address, from: &Address) -> Option<U256> {
        self.effects
            .iter()
            .skip(at)
            .filter_map(|e| match e {
                Effect::Transfer { token: t, from: f, amount, .. } if t == token && f == from => Some(*amount),
                _ => None,
            })
            .try_fold(U256::zero(), |sum, amount| sum.checked_add(amount))
    }

    pub fn extend(&mut self, effects: impl IntoIterator<Item = Effect>) {
        self.effects.extend(effects);
    }
}
