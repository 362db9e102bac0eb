//! Fee decorators
//!
//! Rates are on the 1e9 scale. A rate at or above 100% is rejected before
//! any arithmetic; a zero rate leaves the continuation result untouched.

use primitive_types::U256;
use tracing::debug;

use crate::args::ArgReader;
use crate::error::{ArithmeticError, Result};
use crate::journal::Effect;
use crate::math::{check_fee, checked_add, checked_mul, checked_sub, fee_denominator, mul_div_ceil, mul_div_floor};
use crate::vm::Context;

/// Charge `fee` on the input side, returns the fee amount taken
fn charge_in(ctx: &mut Context<'_>, fee: u32) -> Result<U256> {
    check_fee(fee)?;
    let f = U256::from(fee);
    let denom = fee_denominator();

    if ctx.query().is_exact_in {
        let gross = ctx.registers.amount_in;
        let charged = mul_div_ceil(gross, f, denom, "fee_in.amount")?;
        ctx.registers.amount_in = checked_sub(gross, charged, "fee_in.net")?;
        ctx.run()?;
        ctx.registers.amount_in = gross;
        debug!(fee, %gross, %charged, "fee in");
        Ok(charged)
    } else {
        ctx.run()?;
        let net = ctx.registers.amount_in;
        let gross = mul_div_ceil(net, denom, denom - f, "fee_in.gross")?;
        ctx.registers.amount_in = gross;
        debug!(fee, %gross, %net, "fee in");
        Ok(gross - net)
    }
}

/// `fee: u32`
pub(super) fn flat_fee_in(ctx: &mut Context<'_>, args: &[u8]) -> Result<()> {
    let fee = ArgReader::new(args).u32("flat_fee_in.fee")?;
    charge_in(ctx, fee).map(|_| ())
}

/// `fee: u32`, charged on what the taker receives
pub(super) fn flat_fee_out(ctx: &mut Context<'_>, args: &[u8]) -> Result<()> {
    let fee = ArgReader::new(args).u32("flat_fee_out.fee")?;
    check_fee(fee)?;
    let f = U256::from(fee);
    let denom = fee_denominator();

    if ctx.query().is_exact_in {
        ctx.run()?;
        let gross = ctx.registers.amount_out;
        let charged = mul_div_ceil(gross, f, denom, "fee_out.amount")?;
        ctx.registers.amount_out = checked_sub(gross, charged, "fee_out.net")?;
        debug!(fee, %gross, %charged, "fee out");
    } else {
        let net = ctx.registers.amount_out;
        let gross = mul_div_ceil(net, denom, denom - f, "fee_out.gross")?;
        ctx.registers.amount_out = gross;
        ctx.run()?;
        ctx.registers.amount_out = net;
        debug!(fee, %gross, %net, "fee out");
    }
    Ok(())
}

/// `fee: u32`; the effective rate grows with the trade's share of the pool
///
/// `net = x * B / (B + x * fee)` with `B` the input balance, so tiny trades
/// pay almost nothing and a trade the size of the pool pays `fee / (1 + fee)`.
pub(super) fn progressive_fee_in(ctx: &mut Context<'_>, args: &[u8]) -> Result<()> {
    let fee = ArgReader::new(args).u32("progressive_fee_in.fee")?;
    check_fee(fee)?;
    if fee == 0 {
        return ctx.run();
    }
    let f = U256::from(fee);
    let scaled_balance = checked_mul(ctx.registers.balance_in, fee_denominator(), "progressive_fee_in.balance")?;

    if ctx.query().is_exact_in {
        let gross = ctx.registers.amount_in;
        let weight = checked_mul(gross, f, "progressive_fee_in.weight")?;
        let denom = checked_add(scaled_balance, weight, "progressive_fee_in.denominator")?;
        let net = if denom.is_zero() {
            U256::zero()
        } else {
            mul_div_floor(gross, scaled_balance, denom, "progressive_fee_in.net")?
        };
        ctx.registers.amount_in = net;
        ctx.run()?;
        ctx.registers.amount_in = gross;
        debug!(fee, %gross, %net, "progressive fee in");
    } else {
        ctx.run()?;
        let net = ctx.registers.amount_in;
        let weight = checked_mul(net, f, "progressive_fee_in.weight")?;
        if scaled_balance <= weight {
            return Err(ArithmeticError::Underflow {
                op: "progressive_fee_in.denominator",
                lhs: scaled_balance,
                rhs: weight,
            }
            .into());
        }
        let gross = mul_div_ceil(net, scaled_balance, scaled_balance - weight, "progressive_fee_in.gross")?;
        ctx.registers.amount_in = gross;
        debug!(fee, %gross, %net, "progressive fee in");
    }
    Ok(())
}

/// `fee: u32, recipient: address`; flat input fee paid out to `recipient`
///
/// The taker still pays the gross `amount_in` to the maker, who forwards
/// the fee. An enclosing `DynamicBalances` credits the pool with the rest.
pub(super) fn protocol_fee_in(ctx: &mut Context<'_>, args: &[u8]) -> Result<()> {
    let mut reader = ArgReader::new(args);
    let fee = reader.u32("protocol_fee_in.fee")?;
    let recipient = reader.address("protocol_fee_in.recipient")?;

    let charged = charge_in(ctx, fee)?;
    if !charged.is_zero() {
        let query = ctx.query();
        ctx.record(Effect::Transfer {
            token: query.token_in,
            from: query.maker,
            to: recipient,
            amount: charged,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use primitive_types::U256;

    use crate::asm::ProgramBuilder;
    use crate::error::{ArithmeticError, VmError};
    use crate::host::{Ledger, MemoryLedger};
    use crate::instructions::testing::*;
    use crate::journal::{Effect, StorageKey};
    use crate::math::FEE_DENOMINATOR;

    // 0.3%
    const FEE: u32 = 3_000_000;

    #[test]
    fn test_flat_fee_in_exact_in() {
        // fee = ceil(1000 * 0.003) = 3, curve sees 997
        let q = quote(pool(1_000_000, 1_000_000).flat_fee_in(FEE).limit_swap(), true, 1000).unwrap();
        assert_eq!(q.amount_in, U256::from(1000));
        assert_eq!(q.amount_out, U256::from(997));
    }

    #[test]
    fn test_flat_fee_in_exact_out() {
        // net 997, gross = ceil(997e9 / 997e6) = 1000
        let q = quote(pool(1_000_000, 1_000_000).flat_fee_in(FEE).limit_swap(), false, 997).unwrap();
        assert_eq!(q.amount_in, U256::from(1000));
        assert_eq!(q.amount_out, U256::from(997));
    }

    #[test]
    fn test_flat_fee_out_both_directions() {
        let q = quote(pool(1_000_000, 1_000_000).flat_fee_out(FEE).limit_swap(), true, 1000).unwrap();
        assert_eq!(q.amount_out, U256::from(997));

        let q = quote(pool(1_000_000, 1_000_000).flat_fee_out(FEE).limit_swap(), false, 997).unwrap();
        assert_eq!(q.amount_out, U256::from(997));
        assert_eq!(q.amount_in, U256::from(1000));
    }

    #[test]
    fn test_zero_fee_is_identity() {
        let plain = quote(pool(5_000, 7_000).xyc_swap(), true, 333).unwrap();
        for builder in [
            pool(5_000, 7_000).flat_fee_in(0).xyc_swap(),
            pool(5_000, 7_000).flat_fee_out(0).xyc_swap(),
            pool(5_000, 7_000).progressive_fee_in(0).xyc_swap(),
        ] {
            assert_eq!(quote(builder, true, 333).unwrap(), plain);
        }
    }

    #[test]
    fn test_full_fee_is_named_fault() {
        let err = quote(pool(10, 10).flat_fee_in(FEE_DENOMINATOR).xyc_swap(), false, 1).unwrap_err();
        assert_eq!(
            err,
            VmError::ArithmeticFault(ArithmeticError::FeeRate { fee: FEE_DENOMINATOR, max: FEE_DENOMINATOR })
        );
        let err = quote(pool(10, 10).flat_fee_out(u32::MAX).xyc_swap(), true, 1).unwrap_err();
        assert!(matches!(err, VmError::ArithmeticFault(ArithmeticError::FeeRate { .. })));
    }

    #[test]
    fn test_progressive_fee_scales_with_size() {
        // 10% nominal: net = x * B / (B + x * 0.1)
        let fee = FEE_DENOMINATOR / 10;
        let small = quote(pool(1000, 1_000_000).progressive_fee_in(fee).limit_swap(), true, 10).unwrap();
        let large = quote(pool(1000, 1_000_000).progressive_fee_in(fee).limit_swap(), true, 1000).unwrap();

        // 10 * 1000 / 1001 = 9.99 -> 9 ; 1000 * 1000 / 1100 = 909.09 -> 909
        assert_eq!(small.amount_out, U256::from(9 * 1000));
        assert_eq!(large.amount_out, U256::from(909 * 1000));
    }

    #[test]
    fn test_progressive_fee_exact_out_inverts() {
        let fee = FEE_DENOMINATOR / 10;
        // net 909: gross = ceil(909 * 1000 / (1000 - 90.9)) = ceil(999.89) = 1000
        let q = quote(pool(1000, 1000).progressive_fee_in(fee).limit_swap(), false, 909).unwrap();
        assert_eq!(q.amount_in, U256::from(1000));
    }

    #[test]
    fn test_progressive_fee_unreachable_net() {
        // 50%: net can never reach B / fee = 2000, the curve asks for 999000
        let fee = FEE_DENOMINATOR / 2;
        let err = quote(pool(1000, 1000).progressive_fee_in(fee).xyc_swap(), false, 999).unwrap_err();
        assert!(matches!(err, VmError::ArithmeticFault(ArithmeticError::Underflow { .. })));
    }

    #[test]
    fn test_protocol_fee_forwarded_by_maker_in_swap_only() {
        let recipient = [0x77; 20];
        let program = pool(1_000_000, 1_000_000)
            .protocol_fee_in(FEE, recipient)
            .limit_swap()
            .build()
            .unwrap();
        let mut ledger = MemoryLedger::new(0);
        ledger.fund(TOKEN_IN, MAKER, U256::from(10));

        let quoted = crate::quote(&program, &query(true), U256::from(1000), &[], &ledger).unwrap();
        let receipt = crate::swap(&program, &query(true), U256::from(1000), &[], &mut ledger).unwrap();
        assert_eq!(quoted, receipt.quote);
        assert_eq!(
            receipt.effects,
            vec![Effect::Transfer { token: TOKEN_IN, from: MAKER, to: recipient, amount: U256::from(3) }]
        );
        assert_eq!(ledger.balance_of(&TOKEN_IN, &recipient), U256::from(3));
        assert_eq!(ledger.balance_of(&TOKEN_IN, &MAKER), U256::from(7));
    }

    /// Settle `amount_in` from the taker, then run the swap; the taker pays
    /// exactly the quote and the pool keeps what the recipient did not get
    fn settle_protocol_fee(is_exact_in: bool, amount: u64) -> (U256, U256) {
        let recipient = [0x77; 20];
        let program = ProgramBuilder::new()
            .dynamic_balances(TOKEN_IN, U256::from(1_000_000), TOKEN_OUT, U256::from(1_000_000))
            .protocol_fee_in(FEE, recipient)
            .xyc_swap()
            .build()
            .unwrap();
        let query = query(is_exact_in);
        let start = U256::from(1_000_000);
        let mut ledger = MemoryLedger::new(0);
        ledger.fund(TOKEN_IN, TAKER, start);

        let quoted = crate::quote(&program, &query, U256::from(amount), &[], &ledger).unwrap();
        ledger
            .commit(vec![Effect::Transfer { token: TOKEN_IN, from: TAKER, to: MAKER, amount: quoted.amount_in }])
            .unwrap();
        let receipt = crate::swap(&program, &query, U256::from(amount), &[], &mut ledger).unwrap();
        assert_eq!(receipt.quote, quoted);

        let fee = ledger.balance_of(&TOKEN_IN, &recipient);
        assert_eq!(ledger.balance_of(&TOKEN_IN, &TAKER), start - quoted.amount_in);
        assert_eq!(ledger.balance_of(&TOKEN_IN, &MAKER) + fee, quoted.amount_in);

        let key_in = StorageKey::Balance { order_hash: query.order_hash, token: TOKEN_IN };
        assert_eq!(ledger.stored(&key_in), Some(U256::from(1_000_000) + quoted.amount_in - fee));
        (quoted.amount_in, fee)
    }

    #[test]
    fn test_protocol_fee_taker_pays_quote_exact_in() {
        assert_eq!(settle_protocol_fee(true, 1000), (U256::from(1000), U256::from(3)));
    }

    #[test]
    fn test_protocol_fee_taker_pays_quote_exact_out() {
        // net = ceil(1e6 * 997 / 999003) = 998, gross = ceil(998e9 / 997e6) = 1002
        assert_eq!(settle_protocol_fee(false, 997), (U256::from(1002), U256::from(4)));
    }
}
