//! error types for swapvm
//!
//! Every fault aborts the whole top-level run. Variants carry the offending
//! values so callers can surface them instead of a generic failure.

use crate::types::{Address, Register};
use primitive_types::U256;
use thiserror::Error;

/// Guarded arithmetic conditions, checked before the operation runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("fee rate {fee} must be below {max}")]
    FeeRate { fee: u32, max: u32 },

    #[error("division by zero in {0}")]
    DivisionByZero(&'static str),

    #[error("overflow in {0}")]
    Overflow(&'static str),

    #[error("underflow in {op}: {lhs} - {rhs}")]
    Underflow {
        op: &'static str,
        lhs: U256,
        rhs: U256,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("malformed program at pc {pc} (len {len}): {reason}")]
    MalformedProgram {
        pc: usize,
        len: usize,
        reason: &'static str,
    },

    #[error("invalid opcode {opcode:#04x} at pc {pc}")]
    InvalidOpcode { opcode: u8, pc: usize },

    #[error("missing argument {field}: need {needed} bytes, have {available}")]
    MissingArgument {
        field: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("instruction arguments are {len} bytes, limit is 255")]
    ArgumentsTooLong { len: usize },

    #[error("recompute detected: {register} already set to {value}")]
    RecomputeDetected { register: Register, value: U256 },

    #[error("arithmetic fault: {0}")]
    ArithmeticFault(#[from] ArithmeticError),

    #[error("insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: U256, available: U256 },

    #[error("bound exceeded: requested {requested}, available {available}")]
    BoundExceeded { requested: U256, available: U256 },

    #[error("token {} is not part of the configured pair", hex::encode(.0))]
    TokenNotInPair(Address),

    #[error("delegate chopped {chopped} bytes of taker data, only {available} available")]
    ChoppedExceedsAvailable { chopped: usize, available: usize },

    #[error("unknown delegate {}", hex::encode(.0))]
    UnknownDelegate(Address),

    #[error("delegate produced side effects during a static call")]
    StaticCallViolation,

    /// Not raised by the interpreter; for [`ContinuationDelegate`](crate::ContinuationDelegate)
    /// implementations reporting their own failures
    #[error("delegate failed: {reason}")]
    DelegateFailed { reason: String },

    #[error("jump target {target} outside program of length {len}")]
    InvalidJump { target: usize, len: usize },

    #[error("continuation depth limit {limit} exceeded")]
    DepthLimitExceeded { limit: usize },

    #[error("step limit {limit} exceeded")]
    StepLimitExceeded { limit: usize },

    #[error("deadline {deadline} expired at {now}")]
    DeadlineExpired { deadline: u64, now: u64 },

    #[error("order invalidated: bit {index} already used")]
    OrderInvalidated { index: u32 },

    #[error(
        "insufficient balance of {} for {}: requested {requested}, available {available}",
        hex::encode(.token),
        hex::encode(.holder)
    )]
    InsufficientBalance {
        token: Address,
        holder: Address,
        requested: U256,
        available: U256,
    },
}

pub type Result<T> = std::result::Result<T, VmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_fault_is_named() {
        let err: VmError = ArithmeticError::FeeRate { fee: 1_000_000_000, max: 1_000_000_000 }.into();
        assert_eq!(
            err.to_string(),
            "arithmetic fault: fee rate 1000000000 must be below 1000000000"
        );
    }

    #[test]
    fn test_values_surface_in_message() {
        let err = VmError::InsufficientLiquidity {
            requested: U256::from(11),
            available: U256::from(10),
        };
        assert_eq!(err.to_string(), "insufficient liquidity: requested 11, available 10");
    }
}
