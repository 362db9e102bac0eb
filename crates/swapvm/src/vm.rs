//! Interpreter core: dispatcher, continuation engine and entry points
//!
//! A [`Context`] walks the program record by record. The program counter is
//! advanced past a record *before* its handler runs, so a decorator handler
//! that calls [`Context::run`] re-enters the loop on exactly the remaining
//! program. When that nested call returns the counter sits at the end and
//! the outer loop stops as well.
//!
//! Quote and swap share every line of this file; the only mode-dependent
//! branch is [`Context::record`], which drops effects in quote mode.

use std::cell::Cell;

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::delegate::{DelegateCall, DelegateOutcome};
use crate::error::{ArithmeticError, Result, VmError};
use crate::host::{Host, Ledger};
use crate::instructions;
use crate::journal::{Effect, Journal, StorageKey};
use crate::opcode::read_instruction;
use crate::types::{Address, Quote, Registers, TradeQuery};

/// Interpreter bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Dispatcher steps over a whole top-level run, nested runs included
    pub max_steps: usize,
    /// Nested continuation runs, the top-level run counts as one
    ///
    /// Every decorator nests one run, so a jump-free program of `n`
    /// decorators needs `n + 1`. The cap bounds native stack use.
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_steps: 4096,
            max_depth: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Static: identical arithmetic, no effects
    Quote,
    /// Mutating: effects are journaled and committed on success
    Swap,
}

impl ExecutionMode {
    pub fn is_static(self) -> bool {
        matches!(self, ExecutionMode::Quote)
    }
}

pub(crate) struct Context<'a> {
    program: &'a [u8],
    pc: usize,
    query: &'a TradeQuery,
    pub registers: Registers,
    mode: ExecutionMode,
    taker_data: &'a [u8],
    chopped: usize,
    host: &'a dyn Host,
    journal: Journal,
    limits: Limits,
    steps: &'a Cell<usize>,
    depth: usize,
}

impl<'a> Context<'a> {
    /// Fresh interpreter resuming where a delegate call left off
    pub(crate) fn nested(call: &DelegateCall<'a>, registers: Registers, taker_data: &'a [u8]) -> Self {
        Self {
            program: call.program,
            pc: call.next_pc,
            query: call.query,
            registers,
            mode: if call.is_static {
                ExecutionMode::Quote
            } else {
                ExecutionMode::Swap
            },
            taker_data,
            chopped: 0,
            host: call.host,
            journal: call.journal.clone(),
            limits: call.limits,
            steps: call.steps,
            depth: call.depth,
        }
    }

    /// Run from the current pc to the end of the program
    pub(crate) fn run(&mut self) -> Result<()> {
        if self.depth >= self.limits.max_depth {
            return Err(VmError::DepthLimitExceeded {
                limit: self.limits.max_depth,
            });
        }
        self.depth += 1;
        let result = self.run_to_end();
        self.depth -= 1;
        result
    }

    fn run_to_end(&mut self) -> Result<()> {
        while self.pc < self.program.len() {
            self.step()?;
        }
        Ok(())
    }

    fn step(&mut self) -> Result<()> {
        let program = self.program;
        let raw = read_instruction(program, self.pc)?;
        self.pc = raw.next_pc;

        let taken = self.steps.get() + 1;
        if taken > self.limits.max_steps {
            return Err(VmError::StepLimitExceeded {
                limit: self.limits.max_steps,
            });
        }
        self.steps.set(taken);

        let opcode = raw.opcode()?;
        debug!(pc = raw.pc, opcode = opcode.mnemonic(), depth = self.depth, "step");
        instructions::execute(self, opcode, raw.args)
    }

    pub(crate) fn pc(&self) -> usize {
        self.pc
    }

    pub(crate) fn chopped(&self) -> usize {
        self.chopped
    }

    pub(crate) fn into_journal(self) -> Journal {
        self.journal
    }

    pub(crate) fn is_static(&self) -> bool {
        self.mode.is_static()
    }

    pub(crate) fn query(&self) -> &'a TradeQuery {
        self.query
    }

    pub(crate) fn host(&self) -> &'a dyn Host {
        self.host
    }

    /// Storage read, pending writes of this run first
    pub(crate) fn load(&self, key: &StorageKey) -> Option<U256> {
        self.journal.load(key).or_else(|| self.host.load(key))
    }

    /// Number of effects journaled so far
    pub(crate) fn mark(&self) -> usize {
        self.journal.len()
    }

    /// `token` moved out of `from` by effects journaled after `mark`
    pub(crate) fn transferred_since(&self, mark: usize, token: &Address, from: &Address) -> Result<U256> {
        self.journal
            .transferred_since(mark, token, from)
            .ok_or_else(|| ArithmeticError::Overflow("journal.transferred").into())
    }

    /// Journal an effect; a no-op in quote mode
    pub(crate) fn record(&mut self, effect: Effect) {
        if self.is_static() {
            return;
        }
        debug!(?effect, "record");
        self.journal.record(effect);
    }

    pub(crate) fn jump(&mut self, target: usize) -> Result<()> {
        if target > self.program.len() {
            return Err(VmError::InvalidJump {
                target,
                len: self.program.len(),
            });
        }
        self.pc = target;
        Ok(())
    }

    pub(crate) fn delegate_call<'c>(&'c self, args: &'c [u8]) -> DelegateCall<'c> {
        DelegateCall {
            is_static: self.is_static(),
            next_pc: self.pc,
            program: self.program,
            query: self.query,
            registers: self.registers,
            args,
            taker_data: self.taker_data,
            limits: self.limits,
            host: self.host,
            journal: &self.journal,
            steps: self.steps,
            depth: self.depth,
        }
    }

    /// Fold a delegate's answer back into local state
    pub(crate) fn reconcile(&mut self, outcome: DelegateOutcome) -> Result<()> {
        if outcome.next_pc > self.program.len() {
            return Err(VmError::InvalidJump {
                target: outcome.next_pc,
                len: self.program.len(),
            });
        }
        if outcome.chopped > self.taker_data.len() {
            return Err(VmError::ChoppedExceedsAvailable {
                chopped: outcome.chopped,
                available: self.taker_data.len(),
            });
        }
        if self.is_static() && !outcome.effects.is_empty() {
            return Err(VmError::StaticCallViolation);
        }

        self.pc = outcome.next_pc;
        let tail = self.taker_data;
        self.taker_data = &tail[outcome.chopped..];
        self.chopped += outcome.chopped;
        self.registers = outcome.registers;
        self.journal.extend(outcome.effects);
        Ok(())
    }
}

/// Result of a committed swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapReceipt {
    pub quote: Quote,
    pub effects: Vec<Effect>,
}

/// Entry point holding the interpreter limits
#[derive(Debug, Clone, Copy, Default)]
pub struct SwapVm {
    limits: Limits,
}

impl SwapVm {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Price `amount` (the known side of `query`) without side effects
    pub fn quote(
        &self,
        program: &[u8],
        query: &TradeQuery,
        amount: U256,
        taker_data: &[u8],
        host: &dyn Host,
    ) -> Result<Quote> {
        let (quote, _) = self.execute(program, query, amount, taker_data, host, ExecutionMode::Quote)?;
        info!(amount_in = %quote.amount_in, amount_out = %quote.amount_out, "quote");
        Ok(quote)
    }

    /// Price `amount` and commit the journaled effects to `ledger`
    ///
    /// Either the whole run succeeds and every effect is committed, or
    /// nothing reaches the ledger.
    pub fn swap<L: Ledger>(
        &self,
        program: &[u8],
        query: &TradeQuery,
        amount: U256,
        taker_data: &[u8],
        ledger: &mut L,
    ) -> Result<SwapReceipt> {
        let executed = self.execute(program, query, amount, taker_data, &*ledger, ExecutionMode::Swap);
        let (quote, journal) = match executed {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "swap aborted, journal discarded");
                return Err(e);
            }
        };

        let effects = journal.into_effects();
        if let Err(e) = ledger.commit(effects.clone()) {
            warn!(error = %e, "commit rejected, journal discarded");
            return Err(e);
        }

        info!(
            amount_in = %quote.amount_in,
            amount_out = %quote.amount_out,
            effects = effects.len(),
            "swap"
        );
        Ok(SwapReceipt { quote, effects })
    }

    fn execute(
        &self,
        program: &[u8],
        query: &TradeQuery,
        amount: U256,
        taker_data: &[u8],
        host: &dyn Host,
        mode: ExecutionMode,
    ) -> Result<(Quote, Journal)> {
        let steps = Cell::new(0);
        let mut ctx = Context {
            program,
            pc: 0,
            query,
            registers: Registers::for_query(query, amount),
            mode,
            taker_data,
            chopped: 0,
            host,
            journal: Journal::new(),
            limits: self.limits,
            steps: &steps,
            depth: 0,
        };
        ctx.run()?;
        debug!(steps = steps.get(), ?mode, "halted");
        Ok((Quote::from(ctx.registers), ctx.journal))
    }
}

/// [`SwapVm::quote`] with default limits
pub fn quote(
    program: &[u8],
    query: &TradeQuery,
    amount: U256,
    taker_data: &[u8],
    host: &dyn Host,
) -> Result<Quote> {
    SwapVm::default().quote(program, query, amount, taker_data, host)
}

/// [`SwapVm::swap`] with default limits
pub fn swap<L: Ledger>(
    program: &[u8],
    query: &TradeQuery,
    amount: U256,
    taker_data: &[u8],
    ledger: &mut L,
) -> Result<SwapReceipt> {
    SwapVm::default().swap(program, query, amount, taker_data, ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::ProgramBuilder;
    use crate::host::MemoryLedger;

    const TOKEN_A: [u8; 20] = [0xaa; 20];
    const TOKEN_B: [u8; 20] = [0xbb; 20];

    fn query(is_exact_in: bool) -> TradeQuery {
        TradeQuery {
            token_in: TOKEN_A,
            token_out: TOKEN_B,
            is_exact_in,
            maker: [1; 20],
            taker: [2; 20],
            order_hash: [3; 32],
        }
    }

    fn pool(builder: ProgramBuilder) -> ProgramBuilder {
        builder.static_balances(TOKEN_A, U256::from(1000), TOKEN_B, U256::from(1000))
    }

    #[test]
    fn test_empty_program_echoes_amount() {
        let ledger = MemoryLedger::new(0);
        let q = quote(&[], &query(true), U256::from(5), &[], &ledger).unwrap();
        assert_eq!(q, Quote { amount_in: U256::from(5), amount_out: U256::zero() });
    }

    #[test]
    fn test_forward_jump_skips_instructions() {
        // jump over a limit swap straight to the constant product curve
        let skipped = pool(ProgramBuilder::new()).len() + 4;
        let program = pool(ProgramBuilder::new())
            .jump(skipped as u16 + 2)
            .limit_swap()
            .xyc_swap()
            .build()
            .unwrap();

        let ledger = MemoryLedger::new(0);
        let q = quote(&program, &query(true), U256::from(100), &[], &ledger).unwrap();
        // 1000 * 100 / 1100
        assert_eq!(q.amount_out, U256::from(90));
    }

    #[test]
    fn test_backward_jump_hits_step_limit() {
        let program = ProgramBuilder::new().salt(&[]).jump(0).build().unwrap();
        let ledger = MemoryLedger::new(0);
        let vm = SwapVm::new(Limits { max_steps: 100, max_depth: 8 });
        let err = vm.quote(&program, &query(true), U256::one(), &[], &ledger).unwrap_err();
        assert_eq!(err, VmError::StepLimitExceeded { limit: 100 });
    }

    #[test]
    fn test_jump_past_end_rejected() {
        let program = ProgramBuilder::new().jump(9).build().unwrap();
        let ledger = MemoryLedger::new(0);
        let err = quote(&program, &query(true), U256::one(), &[], &ledger).unwrap_err();
        assert_eq!(err, VmError::InvalidJump { target: 9, len: 4 });
    }

    #[test]
    fn test_nested_decorators_respect_depth_limit() {
        let program = pool(ProgramBuilder::new())
            .flat_fee_in(1_000)
            .flat_fee_in(1_000)
            .flat_fee_in(1_000)
            .xyc_swap()
            .build()
            .unwrap();
        let ledger = MemoryLedger::new(0);

        // top level plus three fee wrappers
        let vm = SwapVm::new(Limits { max_steps: 64, max_depth: 4 });
        assert!(vm.quote(&program, &query(true), U256::from(10), &[], &ledger).is_ok());

        let vm = SwapVm::new(Limits { max_steps: 64, max_depth: 3 });
        let err = vm.quote(&program, &query(true), U256::from(10), &[], &ledger).unwrap_err();
        assert_eq!(err, VmError::DepthLimitExceeded { limit: 3 });
    }

    #[test]
    fn test_default_limits_admit_long_decorator_stacks() {
        // 64 zero-fee wrappers: 65 nested runs
        let program = (0..64)
            .fold(pool(ProgramBuilder::new()), |b, _| b.flat_fee_in(0))
            .xyc_swap()
            .build()
            .unwrap();
        let ledger = MemoryLedger::new(0);
        let q = quote(&program, &query(true), U256::from(100), &[], &ledger).unwrap();
        assert_eq!(q.amount_out, U256::from(90));

        let program = (0..Limits::default().max_depth)
            .fold(pool(ProgramBuilder::new()), |b, _| b.flat_fee_in(0))
            .xyc_swap()
            .build()
            .unwrap();
        let err = quote(&program, &query(true), U256::from(100), &[], &ledger).unwrap_err();
        assert_eq!(err, VmError::DepthLimitExceeded { limit: Limits::default().max_depth });
    }

    #[test]
    fn test_quote_records_nothing_swap_commits() {
        let program = ProgramBuilder::new().invalidate_bit(7).build().unwrap();
        let mut ledger = MemoryLedger::new(0);
        let key = StorageKey::Bit { maker: [1; 20], index: 7 };

        quote(&program, &query(true), U256::one(), &[], &ledger).unwrap();
        assert_eq!(ledger.stored(&key), None);

        let receipt = swap(&program, &query(true), U256::one(), &[], &mut ledger).unwrap();
        assert_eq!(receipt.effects, vec![Effect::Store { key, value: U256::one() }]);
        assert_eq!(ledger.stored(&key), Some(U256::one()));

        // the bit is spent now
        let err = quote(&program, &query(true), U256::one(), &[], &ledger).unwrap_err();
        assert_eq!(err, VmError::OrderInvalidated { index: 7 });
    }

    #[test]
    fn test_aborted_swap_commits_nothing() {
        // bit is journaled, then the curve runs out of liquidity
        let program = pool(ProgramBuilder::new().invalidate_bit(1))
            .xyc_swap()
            .build()
            .unwrap();
        let mut ledger = MemoryLedger::new(0);
        let err = swap(&program, &query(false), U256::from(1000), &[], &mut ledger).unwrap_err();
        assert!(matches!(err, VmError::InsufficientLiquidity { .. }));
        assert_eq!(ledger.stored(&StorageKey::Bit { maker: [1; 20], index: 1 }), None);
    }
}
