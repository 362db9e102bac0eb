//! Balance sources for the curves that follow

use primitive_types::U256;
use tracing::debug;

use crate::args::ArgReader;
use crate::error::{Result, VmError};
use crate::journal::{Effect, StorageKey};
use crate::math::{checked_add, checked_sub};
use crate::types::TokenPair;
use crate::vm::Context;

/// Map a pair onto the queried direction
fn directed(ctx: &Context<'_>, pair: &TokenPair) -> Result<(U256, U256)> {
    let query = ctx.query();
    let balance_in = pair
        .amount_of(&query.token_in)
        .ok_or(VmError::TokenNotInPair(query.token_in))?;
    let balance_out = pair
        .amount_of(&query.token_out)
        .ok_or(VmError::TokenNotInPair(query.token_out))?;
    Ok((balance_in, balance_out))
}

/// Balances baked into the program
pub(super) fn static_balances(ctx: &mut Context<'_>, args: &[u8]) -> Result<()> {
    let pair = ArgReader::new(args).token_pair("static_balances.pair")?;
    let (balance_in, balance_out) = directed(ctx, &pair)?;
    ctx.registers.balance_in = balance_in;
    ctx.registers.balance_out = balance_out;
    Ok(())
}

/// Balances kept in storage per order, seeded from the program
///
/// Decorates the rest of the program: after it priced the trade the new
/// balances are written back (swap mode only). The pool is credited with
/// `amount_in` minus whatever the maker forwarded as protocol fees.
pub(super) fn dynamic_balances(ctx: &mut Context<'_>, args: &[u8]) -> Result<()> {
    let initial = ArgReader::new(args).token_pair("dynamic_balances.pair")?;
    let (initial_in, initial_out) = directed(ctx, &initial)?;

    let query = ctx.query();
    let key_in = StorageKey::Balance {
        order_hash: query.order_hash,
        token: query.token_in,
    };
    let key_out = StorageKey::Balance {
        order_hash: query.order_hash,
        token: query.token_out,
    };
    let balance_in = ctx.load(&key_in).unwrap_or(initial_in);
    let balance_out = ctx.load(&key_out).unwrap_or(initial_out);

    ctx.registers.balance_in = balance_in;
    ctx.registers.balance_out = balance_out;
    let mark = ctx.mark();
    ctx.run()?;

    let (amount_in, amount_out) = (ctx.registers.amount_in, ctx.registers.amount_out);
    if amount_out > balance_out {
        return Err(VmError::InsufficientLiquidity {
            requested: amount_out,
            available: balance_out,
        });
    }
    let new_in = checked_add(balance_in, amount_in, "dynamic_balances.balance_in")?;
    // input the maker forwarded to fee recipients never reaches the pool
    let forwarded = ctx.transferred_since(mark, &query.token_in, &query.maker)?;
    let new_in = checked_sub(new_in, forwarded, "dynamic_balances.forwarded")?;
    let new_out = checked_sub(balance_out, amount_out, "dynamic_balances.balance_out")?;
    debug!(%new_in, %new_out, "dynamic balances updated");

    ctx.record(Effect::Store { key: key_in, value: new_in });
    ctx.record(Effect::Store { key: key_out, value: new_out });
    Ok(())
}
