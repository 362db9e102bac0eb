//! Rounded fixed-point helpers
//!
//! Products are taken in 512 bits so `a * b / d` never overflows in the
//! middle; only a quotient that does not fit 256 bits is an overflow.
//! Callers pick floor for amounts paid to the taker and ceil for amounts
//! the taker owes.

use crate::error::ArithmeticError;
use primitive_types::{U256, U512};

/// Fee rates are expressed on a 1e9 scale (1_000_000_000 = 100%)
pub const FEE_DENOMINATOR: u32 = 1_000_000_000;

pub fn fee_denominator() -> U256 {
    U256::from(FEE_DENOMINATOR)
}

/// Reject fee rates at or above 100% before any division uses them
pub fn check_fee(fee: u32) -> Result<(), ArithmeticError> {
    if fee >= FEE_DENOMINATOR {
        return Err(ArithmeticError::FeeRate {
            fee,
            max: FEE_DENOMINATOR,
        });
    }
    Ok(())
}

fn full_div(a: U256, b: U256, d: U256, op: &'static str) -> Result<(U256, bool), ArithmeticError> {
    if d.is_zero() {
        return Err(ArithmeticError::DivisionByZero(op));
    }
    let product = a.full_mul(b);
    let d = U512::from(d);
    let q = product / d;
    let inexact = !(product % d).is_zero();
    let q = U256::try_from(q).map_err(|_| ArithmeticError::Overflow(op))?;
    Ok((q, inexact))
}

/// floor(a * b / d)
pub fn mul_div_floor(a: U256, b: U256, d: U256, op: &'static str) -> Result<U256, ArithmeticError> {
    full_div(a, b, d, op).map(|(q, _)| q)
}

/// ceil(a * b / d)
pub fn mul_div_ceil(a: U256, b: U256, d: U256, op: &'static str) -> Result<U256, ArithmeticError> {
    let (q, inexact) = full_div(a, b, d, op)?;
    if inexact {
        q.checked_add(U256::one()).ok_or(ArithmeticError::Overflow(op))
    } else {
        Ok(q)
    }
}

pub fn checked_add(a: U256, b: U256, op: &'static str) -> Result<U256, ArithmeticError> {
    a.checked_add(b).ok_or(ArithmeticError::Overflow(op))
}

pub fn checked_sub(a: U256, b: U256, op: &'static str) -> Result<U256, ArithmeticError> {
    a.checked_sub(b)
        .ok_or(ArithmeticError::Underflow { op, lhs: a, rhs: b })
}

pub fn checked_mul(a: U256, b: U256, op: &'static str) -> Result<U256, ArithmeticError> {
    a.checked_mul(b).ok_or(ArithmeticError::Overflow(op))
}
