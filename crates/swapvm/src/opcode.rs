//! Opcodes and the `(opcode, argsLength, args)` record format

use crate::error::{Result, VmError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Jump = 0x00,             // payload: u16 target pc
    Salt = 0x01,             // payload: anything, ignored
    Deadline = 0x02,         // payload: u64 unix seconds
    InvalidateBit = 0x03,    // payload: u32 bit index
    StaticBalances = 0x04,   // payload: token pair (104 bytes)
    DynamicBalances = 0x05,  // payload: token pair of initial balances
    FlatFeeIn = 0x06,        // payload: u32 fee (1e9 scale)
    FlatFeeOut = 0x07,       // payload: u32 fee
    ProgressiveFeeIn = 0x08, // payload: u32 fee
    ProtocolFeeIn = 0x09,    // payload: u32 fee + 20 byte recipient
    Concentrate = 0x0A,      // payload: token pair of virtual deltas
    XycSwap = 0x0B,          // no payload
    LimitSwap = 0x0C,        // no payload
    Extruction = 0x0D,       // payload: 20 byte delegate + delegate args
}

impl Opcode {
    /// Number of opcodes; every byte at or above this is invalid
    pub const COUNT: u8 = 0x0E;

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Jump => "jump",
            Opcode::Salt => "salt",
            Opcode::Deadline => "deadline",
            Opcode::InvalidateBit => "invalidate_bit",
            Opcode::StaticBalances => "static_balances",
            Opcode::DynamicBalances => "dynamic_balances",
            Opcode::FlatFeeIn => "flat_fee_in",
            Opcode::FlatFeeOut => "flat_fee_out",
            Opcode::ProgressiveFeeIn => "progressive_fee_in",
            Opcode::ProtocolFeeIn => "protocol_fee_in",
            Opcode::Concentrate => "concentrate",
            Opcode::XycSwap => "xyc_swap",
            Opcode::LimitSwap => "limit_swap",
            Opcode::Extruction => "extruction",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;
    fn try_from(v: u8) -> std::result::Result<Self, Self::Error> {
        use Opcode::*;
        Ok(match v {
            0x00 => Jump,
            0x01 => Salt,
            0x02 => Deadline,
            0x03 => InvalidateBit,
            0x04 => StaticBalances,
            0x05 => DynamicBalances,
            0x06 => FlatFeeIn,
            0x07 => FlatFeeOut,
            0x08 => ProgressiveFeeIn,
            0x09 => ProtocolFeeIn,
            0x0A => Concentrate,
            0x0B => XycSwap,
            0x0C => LimitSwap,
            0x0D => Extruction,
            other => return Err(other),
        })
    }
}

/// One undecoded record borrowed from the program
#[derive(Debug, Clone, Copy)]
pub struct RawInstruction<'a> {
    pub pc: usize,
    pub opcode: u8,
    pub args: &'a [u8],
    /// Offset of the following record
    pub next_pc: usize,
}

impl RawInstruction<'_> {
    pub fn opcode(&self) -> Result<Opcode> {
        Opcode::try_from(self.opcode).map_err(|opcode| VmError::InvalidOpcode { opcode, pc: self.pc })
    }
}

/// Read the record starting at `pc`
pub fn read_instruction(program: &[u8], pc: usize) -> Result<RawInstruction<'_>> {
    let len = program.len();
    if len.saturating_sub(pc) < 2 {
        return Err(VmError::MalformedProgram {
            pc,
            len,
            reason: "truncated opcode or args length",
        });
    }
    let opcode = program[pc];
    let args_end = pc + 2 + program[pc + 1] as usize;
    if args_end > len {
        return Err(VmError::MalformedProgram {
            pc,
            len,
            reason: "args length exceeds remaining bytes",
        });
    }
    Ok(RawInstruction {
        pc,
        opcode,
        args: &program[pc + 2..args_end],
        next_pc: args_end,
    })
}
