//! Pricing curves and liquidity shaping

use tracing::debug;

use super::ensure_unset;
use crate::args::ArgReader;
use crate::error::{Result, VmError};
use crate::math::{checked_add, mul_div_ceil, mul_div_floor};
use crate::types::Register;
use crate::vm::Context;

/// Constant product `x * y = k`, no arguments
pub(super) fn xyc_swap(ctx: &mut Context<'_>, _args: &[u8]) -> Result<()> {
    let r = ctx.registers;
    if ctx.query().is_exact_in {
        ensure_unset(Register::AmountOut, r.amount_out)?;
        let denom = checked_add(r.balance_in, r.amount_in, "xyc_swap.balance_in")?;
        let out = mul_div_floor(r.balance_out, r.amount_in, denom, "xyc_swap.amount_out")?;
        ctx.registers.amount_out = out;
    } else {
        ensure_unset(Register::AmountIn, r.amount_in)?;
        if r.amount_out >= r.balance_out {
            return Err(VmError::InsufficientLiquidity {
                requested: r.amount_out,
                available: r.balance_out,
            });
        }
        let amount_in = mul_div_ceil(
            r.balance_in,
            r.amount_out,
            r.balance_out - r.amount_out,
            "xyc_swap.amount_in",
        )?;
        ctx.registers.amount_in = amount_in;
    }
    debug!(amount_in = %ctx.registers.amount_in, amount_out = %ctx.registers.amount_out, "xyc swap");
    Ok(())
}

/// Fixed price `balance_out / balance_in`, no arguments
pub(super) fn limit_swap(ctx: &mut Context<'_>, _args: &[u8]) -> Result<()> {
    let r = ctx.registers;
    if ctx.query().is_exact_in {
        ensure_unset(Register::AmountOut, r.amount_out)?;
        let out = mul_div_floor(r.amount_in, r.balance_out, r.balance_in, "limit_swap.amount_out")?;
        if out > r.balance_out {
            return Err(VmError::InsufficientLiquidity {
                requested: out,
                available: r.balance_out,
            });
        }
        ctx.registers.amount_out = out;
    } else {
        ensure_unset(Register::AmountIn, r.amount_in)?;
        if r.amount_out > r.balance_out {
            return Err(VmError::InsufficientLiquidity {
                requested: r.amount_out,
                available: r.balance_out,
            });
        }
        let amount_in = mul_div_ceil(r.amount_out, r.balance_in, r.balance_out, "limit_swap.amount_in")?;
        ctx.registers.amount_in = amount_in;
    }
    debug!(amount_in = %ctx.registers.amount_in, amount_out = %ctx.registers.amount_out, "limit swap");
    Ok(())
}

/// Virtual liquidity: `tokenA, deltaA, tokenB, deltaB`
///
/// The rest of the program prices against `real + delta` balances; the
/// output may not exceed the real balance.
pub(super) fn concentrate(ctx: &mut Context<'_>, args: &[u8]) -> Result<()> {
    let deltas = ArgReader::new(args).token_pair("concentrate.deltas")?;
    let query = ctx.query();
    let delta_in = deltas
        .amount_of(&query.token_in)
        .ok_or(VmError::TokenNotInPair(query.token_in))?;
    let delta_out = deltas
        .amount_of(&query.token_out)
        .ok_or(VmError::TokenNotInPair(query.token_out))?;

    let real_in = ctx.registers.balance_in;
    let real_out = ctx.registers.balance_out;
    ctx.registers.balance_in = checked_add(real_in, delta_in, "concentrate.balance_in")?;
    ctx.registers.balance_out = checked_add(real_out, delta_out, "concentrate.balance_out")?;
    ctx.run()?;
    ctx.registers.balance_in = real_in;
    ctx.registers.balance_out = real_out;

    if ctx.registers.amount_out > real_out {
        return Err(VmError::BoundExceeded {
            requested: ctx.registers.amount_out,
            available: real_out,
        });
    }
    Ok(())
}
