//! SwapVM - bytecode pricing interpreter
//!
//! A maker publishes a program: a flat list of `(opcode, argsLength, args)`
//! records. The interpreter runs it against a taker's [`TradeQuery`] to
//! solve whichever of `amount_in` / `amount_out` the taker did not fix.
//!
//! Key pieces:
//! - decorators (fees, virtual liquidity, dynamic balances) re-enter the
//!   interpreter to run the rest of the program, then adjust its result
//! - terminal curves solve the unknown amount with a recompute guard
//! - `quote` and `swap` share every formula; swap additionally journals
//!   storage writes and transfers and commits them through a [`Ledger`]
//! - `Extruction` hands a slot to an external [`ContinuationDelegate`]
//!
//! ```
//! use swapvm::{MemoryLedger, ProgramBuilder, TradeQuery, U256};
//!
//! let (a, b) = ([0xaa; 20], [0xbb; 20]);
//! let program = ProgramBuilder::new()
//!     .static_balances(a, U256::from(1000), b, U256::from(1000))
//!     .xyc_swap()
//!     .build()
//!     .unwrap();
//! let query = TradeQuery {
//!     token_in: a,
//!     token_out: b,
//!     is_exact_in: true,
//!     maker: [1; 20],
//!     taker: [2; 20],
//!     order_hash: swapvm::order_hash(&[1; 20], &program),
//! };
//! let quote = swapvm::quote(&program, &query, U256::from(100), &[], &MemoryLedger::default()).unwrap();
//! assert_eq!(quote.amount_out, U256::from(90));
//! ```

pub mod args;
pub mod asm;
pub mod delegate;
pub mod disasm;
pub mod error;
pub mod host;
pub mod journal;
pub mod math;
pub mod opcode;
pub mod types;
pub mod vm;

mod instructions;

pub use primitive_types::U256;

pub use asm::{decode_program, Instruction, ProgramBuilder};
pub use delegate::{resume, ContinuationDelegate, DelegateCall, DelegateOutcome};
pub use disasm::disassemble;
pub use error::{ArithmeticError, Result, VmError};
pub use host::{Host, Ledger, MemoryLedger};
pub use journal::{Effect, Journal, StorageKey};
pub use math::FEE_DENOMINATOR;
pub use opcode::Opcode;
pub use types::{order_hash, Address, Hash, Quote, Register, Registers, TokenPair, TradeQuery};
pub use vm::{quote, swap, ExecutionMode, Limits, SwapReceipt, SwapVm};
