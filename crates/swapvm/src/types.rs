//! Core types threaded through every instruction
//!
//! A run owns exactly one [`TradeQuery`] (read-only) and one [`Registers`]
//! block (mutable). Both live for one top-level `quote`/`swap` call.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 20-byte account / token identifier
pub type Address = [u8; 20];

/// 32-byte hash
pub type Hash = [u8; 32];

/// What the counter-party asked for. Never mutated during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeQuery {
    /// Asset the taker gives
    #[serde(with = "hex::serde")]
    pub token_in: Address,
    /// Asset the taker receives
    #[serde(with = "hex::serde")]
    pub token_out: Address,
    /// true: taker fixed `amount_in`, solve `amount_out`
    pub is_exact_in: bool,
    /// Liquidity owner whose program is executed
    #[serde(with = "hex::serde")]
    pub maker: Address,
    /// Counter-party asking for the quote
    #[serde(with = "hex::serde")]
    pub taker: Address,
    /// Opaque correlation id (keys per-order storage)
    #[serde(with = "hex::serde")]
    pub order_hash: Hash,
}

/// Which amount register a fault refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Register {
    AmountIn,
    AmountOut,
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Register::AmountIn => write!(f, "amount_in"),
            Register::AmountOut => write!(f, "amount_out"),
        }
    }
}

/// Mutable trade state passed by reference through the instruction chain
///
/// Before the terminal curve runs exactly one of `amount_in` / `amount_out`
/// is the known side (fixed by `TradeQuery::is_exact_in`); the other one is
/// zero until a curve solves it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub balance_in: U256,
    pub balance_out: U256,
    pub amount_in: U256,
    pub amount_out: U256,
}

impl Registers {
    /// Initial registers for a query: the known side holds `amount`
    pub fn for_query(query: &TradeQuery, amount: U256) -> Self {
        if query.is_exact_in {
            Self { amount_in: amount, ..Self::default() }
        } else {
            Self { amount_out: amount, ..Self::default() }
        }
    }
}

/// Result of a run: the solved amount pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub amount_in: U256,
    pub amount_out: U256,
}

impl From<Registers> for Quote {
    fn from(r: Registers) -> Self {
        Self {
            amount_in: r.amount_in,
            amount_out: r.amount_out,
        }
    }
}

/// Token/amount pair baked into a program (balances, virtual liquidity)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(with = "hex::serde")]
    pub token_a: Address,
    pub amount_a: U256,
    #[serde(with = "hex::serde")]
    pub token_b: Address,
    pub amount_b: U256,
}

impl TokenPair {
    /// Amount configured for `token`, if it is one of the pair
    pub fn amount_of(&self, token: &Address) -> Option<U256> {
        if *token == self.token_a {
            Some(self.amount_a)
        } else if *token == self.token_b {
            Some(self.amount_b)
        } else {
            None
        }
    }
}

/// Default order hash: sha256(maker || program)
pub fn order_hash(maker: &Address, program: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(maker);
    hasher.update(program);
    hasher.finalize().into()
}
