//! Program assembly
//!
//! [`Instruction`] is the typed form of one record; [`ProgramBuilder`]
//! concatenates records into the wire format the interpreter runs.

use std::fmt;

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::args::{u256_bytes, ArgReader};
use crate::error::{Result, VmError};
use crate::opcode::{read_instruction, Opcode};
use crate::types::{Address, TokenPair};

/// Decoded instruction, also the JSON form accepted by `swapvm asm`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    Jump {
        target: u16,
    },
    Salt {
        #[serde(with = "hex::serde", default)]
        data: Vec<u8>,
    },
    Deadline {
        timestamp: u64,
    },
    InvalidateBit {
        index: u32,
    },
    StaticBalances(TokenPair),
    DynamicBalances(TokenPair),
    FlatFeeIn {
        fee: u32,
    },
    FlatFeeOut {
        fee: u32,
    },
    ProgressiveFeeIn {
        fee: u32,
    },
    ProtocolFeeIn {
        fee: u32,
        #[serde(with = "hex::serde")]
        recipient: Address,
    },
    Concentrate(TokenPair),
    XycSwap,
    LimitSwap,
    Extruction {
        #[serde(with = "hex::serde")]
        delegate: Address,
        #[serde(with = "hex::serde", default)]
        args: Vec<u8>,
    },
}

fn pair_bytes(pair: &TokenPair, out: &mut Vec<u8>) {
    out.extend_from_slice(&pair.token_a);
    out.extend_from_slice(&u256_bytes(pair.amount_a));
    out.extend_from_slice(&pair.token_b);
    out.extend_from_slice(&u256_bytes(pair.amount_b));
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Jump { .. } => Opcode::Jump,
            Instruction::Salt { .. } => Opcode::Salt,
            Instruction::Deadline { .. } => Opcode::Deadline,
            Instruction::InvalidateBit { .. } => Opcode::InvalidateBit,
            Instruction::StaticBalances(_) => Opcode::StaticBalances,
            Instruction::DynamicBalances(_) => Opcode::DynamicBalances,
            Instruction::FlatFeeIn { .. } => Opcode::FlatFeeIn,
            Instruction::FlatFeeOut { .. } => Opcode::FlatFeeOut,
            Instruction::ProgressiveFeeIn { .. } => Opcode::ProgressiveFeeIn,
            Instruction::ProtocolFeeIn { .. } => Opcode::ProtocolFeeIn,
            Instruction::Concentrate(_) => Opcode::Concentrate,
            Instruction::XycSwap => Opcode::XycSwap,
            Instruction::LimitSwap => Opcode::LimitSwap,
            Instruction::Extruction { .. } => Opcode::Extruction,
        }
    }

    /// Argument bytes of this record
    pub fn encode_args(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Instruction::Jump { target } => out.extend_from_slice(&target.to_be_bytes()),
            Instruction::Salt { data } => out.extend_from_slice(data),
            Instruction::Deadline { timestamp } => out.extend_from_slice(&timestamp.to_be_bytes()),
            Instruction::InvalidateBit { index } => out.extend_from_slice(&index.to_be_bytes()),
            Instruction::StaticBalances(pair)
            | Instruction::DynamicBalances(pair)
            | Instruction::Concentrate(pair) => pair_bytes(pair, &mut out),
            Instruction::FlatFeeIn { fee }
            | Instruction::FlatFeeOut { fee }
            | Instruction::ProgressiveFeeIn { fee } => out.extend_from_slice(&fee.to_be_bytes()),
            Instruction::ProtocolFeeIn { fee, recipient } => {
                out.extend_from_slice(&fee.to_be_bytes());
                out.extend_from_slice(recipient);
            }
            Instruction::XycSwap | Instruction::LimitSwap => {}
            Instruction::Extruction { delegate, args } => {
                out.extend_from_slice(delegate);
                out.extend_from_slice(args);
            }
        }
        out
    }

    /// Parse argument bytes the way the handler for `opcode` reads them
    pub fn decode(opcode: Opcode, args: &[u8]) -> Result<Self> {
        let mut r = ArgReader::new(args);
        Ok(match opcode {
            Opcode::Jump => Instruction::Jump { target: r.u16("jump.target")? },
            Opcode::Salt => Instruction::Salt { data: args.to_vec() },
            Opcode::Deadline => Instruction::Deadline {
                timestamp: r.u64("deadline.timestamp")?,
            },
            Opcode::InvalidateBit => Instruction::InvalidateBit {
                index: r.u32("invalidate_bit.index")?,
            },
            Opcode::StaticBalances => Instruction::StaticBalances(r.token_pair("static_balances.pair")?),
            Opcode::DynamicBalances => Instruction::DynamicBalances(r.token_pair("dynamic_balances.pair")?),
            Opcode::FlatFeeIn => Instruction::FlatFeeIn { fee: r.u32("flat_fee_in.fee")? },
            Opcode::FlatFeeOut => Instruction::FlatFeeOut { fee: r.u32("flat_fee_out.fee")? },
            Opcode::ProgressiveFeeIn => Instruction::ProgressiveFeeIn {
                fee: r.u32("progressive_fee_in.fee")?,
            },
            Opcode::ProtocolFeeIn => Instruction::ProtocolFeeIn {
                fee: r.u32("protocol_fee_in.fee")?,
                recipient: r.address("protocol_fee_in.recipient")?,
            },
            Opcode::Concentrate => Instruction::Concentrate(r.token_pair("concentrate.deltas")?),
            Opcode::XycSwap => Instruction::XycSwap,
            Opcode::LimitSwap => Instruction::LimitSwap,
            Opcode::Extruction => Instruction::Extruction {
                delegate: r.address("extruction.delegate")?,
                args: r.rest().to_vec(),
            },
        })
    }
}

fn fmt_pair(f: &mut fmt::Formatter<'_>, pair: &TokenPair) -> fmt::Result {
    write!(
        f,
        "({}={}, {}={})",
        hex::encode(pair.token_a),
        pair.amount_a,
        hex::encode(pair.token_b),
        pair.amount_b
    )
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode().mnemonic())?;
        match self {
            Instruction::Jump { target } => write!(f, " (target={:04x})", target),
            Instruction::Salt { data } => write!(f, " ({} bytes)", data.len()),
            Instruction::Deadline { timestamp } => write!(f, " ({})", timestamp),
            Instruction::InvalidateBit { index } => write!(f, " (index={})", index),
            Instruction::StaticBalances(pair)
            | Instruction::DynamicBalances(pair)
            | Instruction::Concentrate(pair) => {
                f.write_str(" ")?;
                fmt_pair(f, pair)
            }
            Instruction::FlatFeeIn { fee }
            | Instruction::FlatFeeOut { fee }
            | Instruction::ProgressiveFeeIn { fee } => write!(f, " (fee={})", fee),
            Instruction::ProtocolFeeIn { fee, recipient } => {
                write!(f, " (fee={}, recipient={})", fee, hex::encode(recipient))
            }
            Instruction::XycSwap | Instruction::LimitSwap => Ok(()),
            Instruction::Extruction { delegate, args } => {
                write!(f, " (delegate={}, {} arg bytes)", hex::encode(delegate), args.len())
            }
        }
    }
}

/// Decode a whole program into `(pc, instruction)` pairs, in byte order
pub fn decode_program(program: &[u8]) -> Result<Vec<(usize, Instruction)>> {
    let mut out = Vec::new();
    let mut pc = 0;
    while pc < program.len() {
        let raw = read_instruction(program, pc)?;
        out.push((pc, Instruction::decode(raw.opcode()?, raw.args)?));
        pc = raw.next_pc;
    }
    Ok(out)
}

/// Fluent program assembler
///
/// ```
/// use swapvm::{ProgramBuilder, U256};
///
/// let program = ProgramBuilder::new()
///     .static_balances([1; 20], U256::from(1000), [2; 20], U256::from(1000))
///     .flat_fee_in(3_000_000)
///     .xyc_swap()
///     .build()
///     .unwrap();
/// assert_eq!(program[106], 0x06);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProgramBuilder {
    records: Vec<(u8, Vec<u8>)>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, instruction: Instruction) -> Self {
        let args = instruction.encode_args();
        self.records.push((instruction.opcode() as u8, args));
        self
    }

    /// Arbitrary record, opcode byte not checked
    pub fn raw(mut self, opcode: u8, args: &[u8]) -> Self {
        self.records.push((opcode, args.to_vec()));
        self
    }

    pub fn jump(self, target: u16) -> Self {
        self.push(Instruction::Jump { target })
    }

    pub fn salt(self, data: &[u8]) -> Self {
        self.push(Instruction::Salt { data: data.to_vec() })
    }

    pub fn deadline(self, timestamp: u64) -> Self {
        self.push(Instruction::Deadline { timestamp })
    }

    pub fn invalidate_bit(self, index: u32) -> Self {
        self.push(Instruction::InvalidateBit { index })
    }

    pub fn static_balances(self, token_a: Address, amount_a: U256, token_b: Address, amount_b: U256) -> Self {
        self.push(Instruction::StaticBalances(TokenPair {
            token_a,
            amount_a,
            token_b,
            amount_b,
        }))
    }

    pub fn dynamic_balances(self, token_a: Address, amount_a: U256, token_b: Address, amount_b: U256) -> Self {
        self.push(Instruction::DynamicBalances(TokenPair {
            token_a,
            amount_a,
            token_b,
            amount_b,
        }))
    }

    pub fn flat_fee_in(self, fee: u32) -> Self {
        self.push(Instruction::FlatFeeIn { fee })
    }

    pub fn flat_fee_out(self, fee: u32) -> Self {
        self.push(Instruction::FlatFeeOut { fee })
    }

    pub fn progressive_fee_in(self, fee: u32) -> Self {
        self.push(Instruction::ProgressiveFeeIn { fee })
    }

    pub fn protocol_fee_in(self, fee: u32, recipient: Address) -> Self {
        self.push(Instruction::ProtocolFeeIn { fee, recipient })
    }

    pub fn concentrate(self, token_a: Address, delta_a: U256, token_b: Address, delta_b: U256) -> Self {
        self.push(Instruction::Concentrate(TokenPair {
            token_a,
            amount_a: delta_a,
            token_b,
            amount_b: delta_b,
        }))
    }

    pub fn xyc_swap(self) -> Self {
        self.push(Instruction::XycSwap)
    }

    pub fn limit_swap(self) -> Self {
        self.push(Instruction::LimitSwap)
    }

    pub fn extruction(self, delegate: Address, args: &[u8]) -> Self {
        self.push(Instruction::Extruction {
            delegate,
            args: args.to_vec(),
        })
    }

    /// Encoded length so far, i.e. the pc of the next record
    pub fn len(&self) -> usize {
        self.records.iter().map(|(_, args)| 2 + args.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn build(self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.len());
        for (opcode, args) in self.records {
            let len = u8::try_from(args.len()).map_err(|_| VmError::ArgumentsTooLong { len: args.len() })?;
            out.push(opcode);
            out.push(len);
            out.extend_from_slice(&args);
        }
        Ok(out)
    }
}

impl FromIterator<Instruction> for ProgramBuilder {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        iter.into_iter().fold(ProgramBuilder::new(), ProgramBuilder::push)
    }
}
