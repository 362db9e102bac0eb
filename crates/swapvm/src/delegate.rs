//! External delegate bridge
//!
//! An `Extruction` slot hands the run to a [`ContinuationDelegate`] found
//! through the host. The delegate gets an owned [`DelegateCall`] snapshot
//! (copied registers, borrowed program and tail data) and answers with a
//! [`DelegateOutcome`]; it never holds the live registers of the caller.
//! To keep pricing the rest of the program it calls [`resume`], which runs
//! the remainder on a fresh interpreter instance.

use std::cell::Cell;

use crate::error::{Result, VmError};
use crate::host::Host;
use crate::journal::{Effect, Journal};
use crate::types::{Registers, TradeQuery};
use crate::vm::{Context, Limits};

/// Foreign instruction honoring the interpreter calling convention
pub trait ContinuationDelegate {
    fn execute(&self, call: DelegateCall<'_>) -> Result<DelegateOutcome>;
}

/// Snapshot of the interpreter state at the `Extruction` slot
pub struct DelegateCall<'a> {
    /// Quote mode: the delegate must not return effects
    pub is_static: bool,
    /// Offset right after the `Extruction` record
    pub next_pc: usize,
    pub program: &'a [u8],
    pub query: &'a TradeQuery,
    pub registers: Registers,
    /// Arguments baked into the program after the delegate address
    pub args: &'a [u8],
    /// Unconsumed taker data
    pub taker_data: &'a [u8],
    pub limits: Limits,
    pub host: &'a dyn Host,
    /// Effects pending so far in this run
    pub journal: &'a Journal,
    pub(crate) steps: &'a Cell<usize>,
    pub(crate) depth: usize,
}

/// What the delegate hands back to the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateOutcome {
    /// Where the caller continues; `program.len()` halts it
    pub next_pc: usize,
    /// Bytes consumed from the front of the taker data
    pub chopped: usize,
    pub registers: Registers,
    /// Effects to append to the caller journal (swap mode only)
    pub effects: Vec<Effect>,
}

impl DelegateOutcome {
    /// Stop the caller right here with `registers`
    pub fn halt(call: &DelegateCall<'_>, registers: Registers) -> Self {
        Self {
            next_pc: call.program.len(),
            chopped: 0,
            registers,
            effects: Vec::new(),
        }
    }
}

/// Run the rest of the program after consuming `consumed` bytes of taker
/// data, starting from `registers`
pub fn resume(call: &DelegateCall<'_>, registers: Registers, consumed: usize) -> Result<DelegateOutcome> {
    if consumed > call.taker_data.len() {
        return Err(VmError::ChoppedExceedsAvailable {
            chopped: consumed,
            available: call.taker_data.len(),
        });
    }

    let taker_data = call.taker_data;
    let mut ctx = Context::nested(call, registers, &taker_data[consumed..]);
    ctx.run()?;

    let chopped = consumed + ctx.chopped();
    let next_pc = ctx.pc();
    let registers = ctx.registers;
    let effects = ctx.into_journal().split_off(call.journal.len());
    Ok(DelegateOutcome {
        next_pc,
        chopped,
        registers,
        effects,
    })
}
