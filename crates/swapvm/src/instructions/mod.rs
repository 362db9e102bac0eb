//! Instruction handlers
//!
//! Every handler takes the live context and its argument bytes. Terminal
//! curves solve the unknown amount register and return. Decorators adjust
//! registers, call [`Context::run`] for the rest of the program, then
//! post-process what the continuation produced.
//!
//! Rounding: amounts the taker owes round up, amounts paid to the taker
//! round down.

mod balances;
mod controls;
mod curves;
mod extruction;
mod fees;

use primitive_types::U256;

use crate::error::{Result, VmError};
use crate::opcode::Opcode;
use crate::types::Register;
use crate::vm::Context;

pub(crate) fn execute(ctx: &mut Context<'_>, opcode: Opcode, args: &[u8]) -> Result<()> {
    match opcode {
        Opcode::Jump => controls::jump(ctx, args),
        Opcode::Salt => Ok(()),
        Opcode::Deadline => controls::deadline(ctx, args),
        Opcode::InvalidateBit => controls::invalidate_bit(ctx, args),
        Opcode::StaticBalances => balances::static_balances(ctx, args),
        Opcode::DynamicBalances => balances::dynamic_balances(ctx, args),
        Opcode::FlatFeeIn => fees::flat_fee_in(ctx, args),
        Opcode::FlatFeeOut => fees::flat_fee_out(ctx, args),
        Opcode::ProgressiveFeeIn => fees::progressive_fee_in(ctx, args),
        Opcode::ProtocolFeeIn => fees::protocol_fee_in(ctx, args),
        Opcode::Concentrate => curves::concentrate(ctx, args),
        Opcode::XycSwap => curves::xyc_swap(ctx, args),
        Opcode::LimitSwap => curves::limit_swap(ctx, args),
        Opcode::Extruction => extruction::extruction(ctx, args),
    }
}

/// Recompute guard: the register about to be solved must still be zero
fn ensure_unset(register: Register, value: U256) -> Result<()> {
    if value.is_zero() {
        Ok(())
    } else {
        Err(VmError::RecomputeDetected { register, value })
    }
}
